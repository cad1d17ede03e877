// 导入标准库和必要的依赖
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::configs::DiscoveryConfig;
use crate::Error;

// 声明子模块
pub mod composite;
pub mod instance;
pub mod simple;

pub use composite::CompositeDiscoveryClient;
pub use instance::ServiceInstance;
pub use simple::SimpleDiscoveryClient;

/// 发现提供者的默认顺序
pub const DEFAULT_ORDER: i32 = 0;

/// 服务发现接口
///
/// 任何注册中心客户端想要参与服务发现，都需要实现这个接口。
/// `order` 越小越先被查询
#[async_trait]
pub trait DiscoveryClient: Send + Sync + Debug {
    /// 可读的实现描述，用于日志和健康检查
    fn description(&self) -> &str;

    /// 根据服务名获取所有实例
    async fn get_instances(&self, service_id: &str) -> Result<Vec<ServiceInstance>, Error>;

    /// 获取所有已知的服务名称
    async fn get_services(&self) -> Result<Vec<String>, Error>;

    /// 轻量级健康检查，验证能否与后端正常通信
    async fn probe(&self) -> Result<(), Error> {
        self.get_services()
            .await
            .map(|_| ())
            .map_err(|e| Error::RegistryUnreachable(format!("{}: {}", self.description(), e)))
    }

    fn order(&self) -> i32 {
        DEFAULT_ORDER
    }
}

/// 构建服务发现客户端
///
/// 存在任意非静态提供者且启用组合发现时，返回组合客户端（静态提供者作为其中一员），
/// 否则退化为只使用配置中的静态实例
///
/// # 参数
/// * `config` - 服务发现配置
/// * `providers` - 额外的发现提供者，按注册顺序排列
pub fn discovery_client(
    config: &DiscoveryConfig,
    providers: Vec<Arc<dyn DiscoveryClient>>,
) -> Arc<dyn DiscoveryClient> {
    if !config.enabled {
        info!("服务发现已禁用");
        return Arc::new(SimpleDiscoveryClient::new(config.simple.order));
    }

    let simple: Arc<dyn DiscoveryClient> = Arc::new(SimpleDiscoveryClient::from_config(&config.simple));

    if config.composite_enabled && !providers.is_empty() {
        let mut all = providers;
        all.push(simple);
        info!("使用组合服务发现, 提供者数量: {}", all.len());
        return Arc::new(CompositeDiscoveryClient::new(all));
    }

    info!("使用静态服务发现");
    simple
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configs::SimpleInstanceConfig;
    use std::collections::HashMap;

    #[derive(Debug)]
    struct FixedDiscovery(Vec<ServiceInstance>);

    #[async_trait]
    impl DiscoveryClient for FixedDiscovery {
        fn description(&self) -> &str {
            "fixed"
        }

        async fn get_instances(&self, service_id: &str) -> Result<Vec<ServiceInstance>, Error> {
            Ok(self
                .0
                .iter()
                .filter(|i| i.service_id == service_id)
                .cloned()
                .collect())
        }

        async fn get_services(&self) -> Result<Vec<String>, Error> {
            Ok(self.0.iter().map(|i| i.service_id.clone()).collect())
        }
    }

    fn config() -> DiscoveryConfig {
        let mut instances = HashMap::new();
        instances.insert(
            "user-service".to_string(),
            vec![SimpleInstanceConfig {
                uri: "http://localhost:8081".to_string(),
                instance_id: None,
                metadata: HashMap::new(),
            }],
        );
        let mut config = DiscoveryConfig::default();
        config.simple.instances = instances;
        config
    }

    #[tokio::test]
    async fn test_falls_back_to_simple_without_providers() {
        let client = discovery_client(&config(), Vec::new());
        assert_eq!(client.description(), SimpleDiscoveryClient::DESCRIPTION);
        assert_eq!(client.get_instances("user-service").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_composite_wins_when_provider_present() {
        let remote = FixedDiscovery(vec![ServiceInstance::new("user-service", "10.0.0.5", 8081, false)]);
        let client = discovery_client(&config(), vec![Arc::new(remote)]);
        assert_eq!(client.description(), CompositeDiscoveryClient::DESCRIPTION);

        let instances = client.get_instances("user-service").await.unwrap();
        assert_eq!(instances.len(), 2);
        assert_eq!(instances[0].host, "10.0.0.5");
        assert_eq!(instances[1].host, "localhost");
    }

    #[tokio::test]
    async fn test_discovery_disabled_has_no_instances() {
        let mut config = config();
        config.enabled = false;
        let client = discovery_client(&config, vec![]);
        assert!(client.get_services().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_composite_disabled_uses_simple() {
        let mut config = config();
        config.composite_enabled = false;
        let remote = FixedDiscovery(vec![ServiceInstance::new("user-service", "10.0.0.5", 8081, false)]);
        let client = discovery_client(&config, vec![Arc::new(remote)]);
        assert_eq!(client.description(), SimpleDiscoveryClient::DESCRIPTION);
    }
}
