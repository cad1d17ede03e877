use std::collections::HashMap;

use async_trait::async_trait;
use tracing::warn;

use crate::configs::SimpleDiscoveryConfig;
use crate::service_discovery::{DiscoveryClient, ServiceInstance};
use crate::Error;

/// 静态服务发现
///
/// 不部署注册中心时，直接使用配置文件中列出的实例
#[derive(Debug, Default, Clone)]
pub struct SimpleDiscoveryClient {
    order: i32,
    instances: HashMap<String, Vec<ServiceInstance>>,
    // 保持配置中服务出现的顺序
    service_names: Vec<String>,
}

impl SimpleDiscoveryClient {
    pub const DESCRIPTION: &'static str = "Simple Discovery Client";

    pub fn new(order: i32) -> Self {
        Self {
            order,
            ..Default::default()
        }
    }

    /// 从配置构建，无法解析的地址会被跳过
    pub fn from_config(config: &SimpleDiscoveryConfig) -> Self {
        let mut client = Self::new(config.order);

        let mut names: Vec<&String> = config.instances.keys().collect();
        names.sort();
        for service_id in names {
            for entry in &config.instances[service_id] {
                match ServiceInstance::from_uri(service_id.as_str(), &entry.uri) {
                    Ok(instance) => {
                        let instance = match &entry.instance_id {
                            Some(id) => instance.with_instance_id(id.clone()),
                            None => instance,
                        };
                        client.add_instance(instance.with_metadata(entry.metadata.clone()));
                    }
                    Err(e) => warn!("忽略无效的静态实例 {} ({}): {}", service_id, entry.uri, e),
                }
            }
        }
        client
    }

    pub fn add_instance(&mut self, instance: ServiceInstance) {
        if !self.instances.contains_key(&instance.service_id) {
            self.service_names.push(instance.service_id.clone());
        }
        self.instances
            .entry(instance.service_id.clone())
            .or_default()
            .push(instance);
    }
}

#[async_trait]
impl DiscoveryClient for SimpleDiscoveryClient {
    fn description(&self) -> &str {
        Self::DESCRIPTION
    }

    async fn get_instances(&self, service_id: &str) -> Result<Vec<ServiceInstance>, Error> {
        Ok(self.instances.get(service_id).cloned().unwrap_or_default())
    }

    async fn get_services(&self) -> Result<Vec<String>, Error> {
        Ok(self.service_names.clone())
    }

    fn order(&self) -> i32 {
        self.order
    }
}
