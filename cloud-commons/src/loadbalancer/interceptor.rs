use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::configs::RetryConfig;
use crate::loadbalancer::client::LoadBalancerClient;
use crate::loadbalancer::request::{HttpRequest, HttpResponse, HttpTransport, LoadBalancerRequestFactory};
use crate::loadbalancer::retry::{RetryContext, RetryCoordinator};
use crate::Error;

/// HTTP 请求拦截器
///
/// 请求URI的主机部分是逻辑服务名，拦截器负责把它解析为具体实例后再发送
#[async_trait]
pub trait ClientHttpRequestInterceptor: Send + Sync {
    async fn intercept(
        &self,
        request: HttpRequest,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<HttpResponse, Error>;
}

fn service_id(request: &HttpRequest) -> Result<String, Error> {
    request
        .uri()
        .host()
        .map(String::from)
        .ok_or_else(|| Error::InvalidUri(format!("请求URI中没有服务名: {}", request.uri())))
}

/// 不带重试的负载均衡拦截器
#[derive(Clone)]
pub struct LoadBalancerInterceptor {
    client: LoadBalancerClient,
    factory: LoadBalancerRequestFactory,
}

impl LoadBalancerInterceptor {
    pub fn new(client: LoadBalancerClient, factory: LoadBalancerRequestFactory) -> Self {
        Self { client, factory }
    }
}

#[async_trait]
impl ClientHttpRequestInterceptor for LoadBalancerInterceptor {
    async fn intercept(
        &self,
        request: HttpRequest,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<HttpResponse, Error> {
        let service_id = service_id(&request)?;
        let request = self.factory.create_request(request, transport);
        self.client.execute(&service_id, &request).await
    }
}

/// 带重试的负载均衡拦截器
#[derive(Clone)]
pub struct RetryLoadBalancerInterceptor {
    coordinator: RetryCoordinator,
    factory: LoadBalancerRequestFactory,
}

impl RetryLoadBalancerInterceptor {
    pub fn new(
        client: LoadBalancerClient,
        config: Arc<RetryConfig>,
        factory: LoadBalancerRequestFactory,
    ) -> Self {
        Self {
            coordinator: RetryCoordinator::new(client, config),
            factory,
        }
    }
}

#[async_trait]
impl ClientHttpRequestInterceptor for RetryLoadBalancerInterceptor {
    async fn intercept(
        &self,
        request: HttpRequest,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<HttpResponse, Error> {
        let context = RetryContext::new(service_id(&request)?).with_uri(request.uri().to_string());
        let method = request.method().clone();
        let request = self.factory.create_request(request, transport);
        self.coordinator
            .execute_with_context(context, &method, &request)
            .await
    }
}

/// 根据重试开关选择拦截器
pub fn load_balancer_interceptor(
    config: Arc<RetryConfig>,
    client: LoadBalancerClient,
    factory: LoadBalancerRequestFactory,
) -> Arc<dyn ClientHttpRequestInterceptor> {
    if config.enabled {
        info!("负载均衡重试已启用");
        Arc::new(RetryLoadBalancerInterceptor::new(client, config, factory))
    } else {
        info!("负载均衡重试未启用");
        Arc::new(LoadBalancerInterceptor::new(client, factory))
    }
}

/// 支持逻辑服务名的 HTTP 客户端
///
/// 例如 `http://user-service/api/v1/users` 会被发送到 user-service 的某个实例
#[derive(Clone)]
pub struct LoadBalancedHttpClient {
    transport: Arc<dyn HttpTransport>,
    interceptor: Arc<dyn ClientHttpRequestInterceptor>,
}

impl LoadBalancedHttpClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        interceptor: Arc<dyn ClientHttpRequestInterceptor>,
    ) -> Self {
        Self {
            transport,
            interceptor,
        }
    }

    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse, Error> {
        self.interceptor
            .intercept(request, self.transport.clone())
            .await
    }

    pub async fn get(&self, uri: &str) -> Result<HttpResponse, Error> {
        let request = http::Request::get(uri).body(bytes::Bytes::new())?;
        self.send(request).await
    }
}
