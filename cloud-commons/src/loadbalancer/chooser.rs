use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rand::Rng;
use tracing::debug;

use crate::service_discovery::{DiscoveryClient, ServiceInstance};
use crate::Error;

/// 服务实例选择器
///
/// 根据服务名从所有可用实例中选择一个，可以被多个请求并发调用
#[async_trait]
pub trait ServiceInstanceChooser: Send + Sync {
    /// 为指定服务选择一个实例，没有候选实例时返回 `NoInstanceAvailable`
    async fn choose(&self, service_id: &str) -> Result<ServiceInstance, Error>;
}

async fn candidates(
    discovery: &dyn DiscoveryClient,
    service_id: &str,
) -> Result<Vec<ServiceInstance>, Error> {
    let instances = discovery.get_instances(service_id).await?;
    if instances.is_empty() {
        return Err(Error::NoInstanceAvailable(service_id.to_string()));
    }
    Ok(instances)
}

/// 轮询选择器，每个服务名维护独立的位置计数
pub struct RoundRobinChooser {
    discovery: Arc<dyn DiscoveryClient>,
    positions: Mutex<HashMap<String, usize>>,
}

impl RoundRobinChooser {
    pub fn new(discovery: Arc<dyn DiscoveryClient>) -> Self {
        Self {
            discovery,
            positions: Mutex::new(HashMap::new()),
        }
    }

    fn next_position(&self, service_id: &str) -> usize {
        let mut positions = self.positions.lock().unwrap_or_else(|e| e.into_inner());
        let position = positions.entry(service_id.to_string()).or_insert(0);
        let current = *position;
        *position = position.wrapping_add(1);
        current
    }

    // 服务已没有实例时丢弃它的计数，计数表只保留当前可用的服务
    fn forget(&self, service_id: &str) {
        let mut positions = self.positions.lock().unwrap_or_else(|e| e.into_inner());
        positions.remove(service_id);
    }
}

#[async_trait]
impl ServiceInstanceChooser for RoundRobinChooser {
    async fn choose(&self, service_id: &str) -> Result<ServiceInstance, Error> {
        let mut instances = match candidates(self.discovery.as_ref(), service_id).await {
            Ok(instances) => instances,
            Err(e) => {
                self.forget(service_id);
                return Err(e);
            }
        };
        let index = self.next_position(service_id) % instances.len();
        let instance = instances.swap_remove(index);
        debug!("轮询选择服务 {} 的实例 {}", service_id, instance.authority());
        Ok(instance)
    }
}

/// 随机选择器
pub struct RandomChooser {
    discovery: Arc<dyn DiscoveryClient>,
}

impl RandomChooser {
    pub fn new(discovery: Arc<dyn DiscoveryClient>) -> Self {
        Self { discovery }
    }
}

#[async_trait]
impl ServiceInstanceChooser for RandomChooser {
    async fn choose(&self, service_id: &str) -> Result<ServiceInstance, Error> {
        let mut instances = candidates(self.discovery.as_ref(), service_id).await?;
        let index = rand::rng().random_range(0..instances.len());
        Ok(instances.swap_remove(index))
    }
}
