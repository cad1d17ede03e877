use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::service_discovery::{DiscoveryClient, ServiceInstance};
use crate::Error;

/// 组合服务发现
///
/// 按 `order` 升序（相同时按注册顺序）依次查询所有提供者并合并结果。
/// 单个提供者失败只会让它的贡献为空，不会中断整个调用
#[derive(Debug, Clone)]
pub struct CompositeDiscoveryClient {
    discovery_clients: Vec<Arc<dyn DiscoveryClient>>,
}

impl CompositeDiscoveryClient {
    pub const DESCRIPTION: &'static str = "Composite Discovery Client";

    /// 组合客户端自身的优先级，排在静态兜底提供者之前
    pub const ORDER: i32 = i32::MIN;

    pub fn new(mut discovery_clients: Vec<Arc<dyn DiscoveryClient>>) -> Self {
        // sort_by_key 是稳定排序，相同 order 保留注册顺序
        discovery_clients.sort_by_key(|client| client.order());
        Self { discovery_clients }
    }

    pub fn discovery_clients(&self) -> &[Arc<dyn DiscoveryClient>] {
        &self.discovery_clients
    }
}

#[async_trait]
impl DiscoveryClient for CompositeDiscoveryClient {
    fn description(&self) -> &str {
        Self::DESCRIPTION
    }

    async fn get_instances(&self, service_id: &str) -> Result<Vec<ServiceInstance>, Error> {
        let mut instances = Vec::new();
        for client in &self.discovery_clients {
            match client.get_instances(service_id).await {
                Ok(found) => instances.extend(found),
                Err(e) => warn!(
                    provider = client.description(),
                    service_id,
                    "发现提供者查询实例失败, 忽略其结果: {}",
                    e
                ),
            }
        }
        debug!("服务 {} 共发现 {} 个实例", service_id, instances.len());
        Ok(instances)
    }

    async fn get_services(&self) -> Result<Vec<String>, Error> {
        let mut seen = HashSet::new();
        let mut services = Vec::new();
        for client in &self.discovery_clients {
            match client.get_services().await {
                Ok(names) => {
                    for name in names {
                        if seen.insert(name.clone()) {
                            services.push(name);
                        }
                    }
                }
                Err(e) => warn!(
                    provider = client.description(),
                    "发现提供者查询服务列表失败, 忽略其结果: {}",
                    e
                ),
            }
        }
        Ok(services)
    }

    async fn probe(&self) -> Result<(), Error> {
        for client in &self.discovery_clients {
            client.probe().await.map_err(|e| match e {
                Error::RegistryUnreachable(msg) => Error::RegistryUnreachable(msg),
                other => Error::RegistryUnreachable(format!("{}: {}", client.description(), other)),
            })?;
        }
        Ok(())
    }

    fn order(&self) -> i32 {
        Self::ORDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Provider {
        name: &'static str,
        order: i32,
        instances: Vec<ServiceInstance>,
        failing: bool,
    }

    impl Provider {
        fn new(name: &'static str, order: i32, hosts: &[&str]) -> Self {
            Self {
                name,
                order,
                instances: hosts
                    .iter()
                    .map(|h| ServiceInstance::new("user-service", *h, 8080, false))
                    .collect(),
                failing: false,
            }
        }

        fn failing(mut self) -> Self {
            self.failing = true;
            self
        }
    }

    #[async_trait]
    impl DiscoveryClient for Provider {
        fn description(&self) -> &str {
            self.name
        }

        async fn get_instances(&self, service_id: &str) -> Result<Vec<ServiceInstance>, Error> {
            if self.failing {
                return Err(Error::RegistryUnreachable(self.name.to_string()));
            }
            Ok(self
                .instances
                .iter()
                .filter(|i| i.service_id == service_id)
                .cloned()
                .collect())
        }

        async fn get_services(&self) -> Result<Vec<String>, Error> {
            if self.failing {
                return Err(Error::RegistryUnreachable(self.name.to_string()));
            }
            Ok(vec![format!("{}-only", self.name), "user-service".to_string()])
        }

        fn order(&self) -> i32 {
            self.order
        }
    }

    fn hosts(instances: &[ServiceInstance]) -> Vec<&str> {
        instances.iter().map(|i| i.host.as_str()).collect()
    }

    #[tokio::test]
    async fn test_instances_merged_by_priority() {
        // 注册顺序与优先级相反
        let p2 = Provider::new("p2", 1, &["C"]);
        let p1 = Provider::new("p1", 0, &["A", "B"]);
        let composite = CompositeDiscoveryClient::new(vec![Arc::new(p2), Arc::new(p1)]);

        let instances = composite.get_instances("user-service").await.unwrap();
        assert_eq!(hosts(&instances), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_ties_keep_registration_order() {
        let first = Provider::new("first", 0, &["X"]);
        let second = Provider::new("second", 0, &["Y"]);
        let composite = CompositeDiscoveryClient::new(vec![Arc::new(first), Arc::new(second)]);

        let instances = composite.get_instances("user-service").await.unwrap();
        assert_eq!(hosts(&instances), vec!["X", "Y"]);
    }

    #[tokio::test]
    async fn test_failing_provider_is_skipped() {
        let p1 = Provider::new("p1", 0, &["A", "B"]).failing();
        let p2 = Provider::new("p2", 1, &["C"]);
        let composite = CompositeDiscoveryClient::new(vec![Arc::new(p1), Arc::new(p2)]);

        let instances = composite.get_instances("user-service").await.unwrap();
        assert_eq!(hosts(&instances), vec!["C"]);

        let services = composite.get_services().await.unwrap();
        assert_eq!(services, vec!["p2-only".to_string(), "user-service".to_string()]);

        assert!(matches!(composite.probe().await, Err(Error::RegistryUnreachable(_))));
    }

    #[tokio::test]
    async fn test_service_names_deduplicated_in_first_seen_order() {
        let p1 = Provider::new("p1", 0, &[]);
        let p2 = Provider::new("p2", 1, &[]);
        let composite = CompositeDiscoveryClient::new(vec![Arc::new(p1), Arc::new(p2)]);

        let services = composite.get_services().await.unwrap();
        assert_eq!(
            services,
            vec![
                "p1-only".to_string(),
                "user-service".to_string(),
                "p2-only".to_string()
            ]
        );
        assert!(composite.probe().await.is_ok());
        assert_eq!(composite.order(), CompositeDiscoveryClient::ORDER);
    }
}
