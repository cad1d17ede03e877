use std::sync::Arc;

use tracing::{debug, warn};
use url::Url;

use crate::loadbalancer::chooser::ServiceInstanceChooser;
use crate::loadbalancer::request::LoadBalancerRequest;
use crate::service_discovery::ServiceInstance;
use crate::Error;

/// 负载均衡请求执行器
///
/// 先为服务选择实例，再对该实例执行请求动作
#[derive(Clone)]
pub struct LoadBalancerClient {
    chooser: Arc<dyn ServiceInstanceChooser>,
}

impl LoadBalancerClient {
    pub fn new(chooser: Arc<dyn ServiceInstanceChooser>) -> Self {
        Self { chooser }
    }

    /// 为服务选择一个实例
    pub async fn choose(&self, service_id: &str) -> Result<ServiceInstance, Error> {
        self.chooser.choose(service_id).await
    }

    /// 选择实例并执行请求，选不出实例时返回 `ServiceUnavailable` 且不调用请求动作
    pub async fn execute<T: Send>(
        &self,
        service_id: &str,
        request: &dyn LoadBalancerRequest<T>,
    ) -> Result<T, Error> {
        let instance = match self.chooser.choose(service_id).await {
            Ok(instance) => instance,
            Err(Error::NoInstanceAvailable(_)) => {
                warn!("服务 {} 没有可用实例", service_id);
                return Err(Error::ServiceUnavailable(service_id.to_string()));
            }
            Err(e) => return Err(e),
        };
        self.execute_with_instance(service_id, &instance, request).await
    }

    /// 对调用方指定的实例执行请求，不经过选择器
    pub async fn execute_with_instance<T: Send>(
        &self,
        service_id: &str,
        instance: &ServiceInstance,
        request: &dyn LoadBalancerRequest<T>,
    ) -> Result<T, Error> {
        debug!("服务 {} 使用实例 {}", service_id, instance.authority());
        request.apply(instance).await
    }

    pub fn reconstruct_uri(&self, instance: &ServiceInstance, original: &Url) -> Result<Url, Error> {
        reconstruct_uri(instance, original)
    }
}

/// 用实例地址替换逻辑URI中的主机和端口
///
/// 协议由实例决定：原协议为 ws/wss 时取 wss/ws，其余取 https/http。
/// 路径、查询参数和片段原样保留
pub fn reconstruct_uri(instance: &ServiceInstance, original: &Url) -> Result<Url, Error> {
    let websocket = matches!(original.scheme(), "ws" | "wss");
    let scheme = match (websocket, instance.secure) {
        (true, true) => "wss",
        (true, false) => "ws",
        (false, true) => "https",
        (false, false) => "http",
    };

    let mut uri = format!("{}://{}{}", scheme, instance.authority(), original.path());
    if let Some(query) = original.query() {
        uri.push('?');
        uri.push_str(query);
    }
    if let Some(fragment) = original.fragment() {
        uri.push('#');
        uri.push_str(fragment);
    }
    Ok(Url::parse(&uri)?)
}
