use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::service_discovery::{DiscoveryClient, ServiceInstance};
use crate::service_register_center::{Registration, ServiceRegistry};
use crate::Error;

/// 注册成功后的默认状态
pub const STATUS_UP: &str = "UP";

/// 进程内的服务注册中心
///
/// 同时实现注册与发现，适用于本地开发和测试
#[derive(Debug, Default)]
pub struct InMemoryServiceRegistry {
    registrations: RwLock<HashMap<String, Registration>>,
    statuses: RwLock<HashMap<String, String>>,
    closed: AtomicBool,
}

impl InMemoryServiceRegistry {
    pub const DESCRIPTION: &'static str = "In-Memory Service Registry";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub async fn registrations(&self) -> Vec<Registration> {
        let mut registrations: Vec<_> = self.registrations.read().await.values().cloned().collect();
        registrations.sort_by(|a, b| a.id.cmp(&b.id));
        registrations
    }

    fn check_open(&self) -> Result<(), Error> {
        if self.is_closed() {
            return Err(Error::RegistrationFailed("注册中心已关闭".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ServiceRegistry for InMemoryServiceRegistry {
    type Status = Option<String>;

    async fn register(&self, registration: &Registration) -> Result<(), Error> {
        self.check_open()?;
        self.registrations
            .write()
            .await
            .insert(registration.id.clone(), registration.clone());
        self.statuses
            .write()
            .await
            .insert(registration.id.clone(), STATUS_UP.to_string());
        info!("服务已注册: {} ({}:{})", registration.id, registration.host, registration.port);
        Ok(())
    }

    async fn deregister(&self, registration: &Registration) -> Result<(), Error> {
        self.check_open()?;
        self.registrations.write().await.remove(&registration.id);
        self.statuses.write().await.remove(&registration.id);
        info!("服务已注销: {}", registration.id);
        Ok(())
    }

    async fn close(&self) -> Result<(), Error> {
        self.closed.store(true, Ordering::SeqCst);
        debug!("内存注册中心已关闭");
        Ok(())
    }

    async fn set_status(&self, registration: &Registration, status: &str) -> Result<(), Error> {
        self.check_open()?;
        if !self.registrations.read().await.contains_key(&registration.id) {
            return Err(Error::RegistrationFailed(format!("服务未注册: {}", registration.id)));
        }
        self.statuses
            .write()
            .await
            .insert(registration.id.clone(), status.to_string());
        Ok(())
    }

    async fn get_status(&self, registration: &Registration) -> Result<Option<String>, Error> {
        Ok(self.statuses.read().await.get(&registration.id).cloned())
    }
}

#[async_trait]
impl DiscoveryClient for InMemoryServiceRegistry {
    fn description(&self) -> &str {
        Self::DESCRIPTION
    }

    async fn get_instances(&self, service_id: &str) -> Result<Vec<ServiceInstance>, Error> {
        let statuses = self.statuses.read().await;
        let mut instances: Vec<_> = self
            .registrations
            .read()
            .await
            .values()
            .filter(|r| r.name == service_id)
            .filter(|r| statuses.get(&r.id).map(String::as_str) == Some(STATUS_UP))
            .map(ServiceInstance::from)
            .collect();
        instances.sort_by(|a, b| a.instance_id.cmp(&b.instance_id));
        Ok(instances)
    }

    async fn get_services(&self) -> Result<Vec<String>, Error> {
        let names: BTreeSet<String> = self
            .registrations
            .read()
            .await
            .values()
            .map(|r| r.name.clone())
            .collect();
        Ok(names.into_iter().collect())
    }
}
