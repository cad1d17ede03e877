use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;
use url::Url;

use crate::loadbalancer::client::reconstruct_uri;
use crate::service_discovery::ServiceInstance;
use crate::Error;

pub type HttpRequest = http::Request<Bytes>;
pub type HttpResponse = http::Response<Bytes>;

/// 针对一个已解析实例执行的请求动作
///
/// 每次尝试对每个解析出的实例只调用一次
#[async_trait]
pub trait LoadBalancerRequest<T: Send>: Send + Sync {
    async fn apply(&self, instance: &ServiceInstance) -> Result<T, Error>;
}

/// 由闭包构成的请求动作
pub struct FnRequest<F>(F);

/// 把 `Fn(ServiceInstance) -> Future` 包装为请求动作
pub fn request_fn<F>(f: F) -> FnRequest<F> {
    FnRequest(f)
}

#[async_trait]
impl<T, F, Fut> LoadBalancerRequest<T> for FnRequest<F>
where
    T: Send,
    F: Fn(ServiceInstance) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, Error>> + Send,
{
    async fn apply(&self, instance: &ServiceInstance) -> Result<T, Error> {
        (self.0)(instance.clone()).await
    }
}

/// 请求转换器
///
/// 在请求发出前基于选中的实例修改请求，例如透传链路追踪信息或实例元数据
pub trait LoadBalancerRequestTransformer: Send + Sync {
    fn transform(&self, request: HttpRequest, instance: &ServiceInstance) -> HttpRequest;
}

/// HTTP 传输层
///
/// 使用具体地址发送请求，网络层失败返回 `Error::Transport`
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, Error>;
}

/// 基于 reqwest 的默认传输实现
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, Error> {
        let request = reqwest::Request::try_from(request)?;
        let response = self.client.execute(request).await?;

        let mut builder = http::Response::builder()
            .status(response.status())
            .version(response.version());
        if let Some(headers) = builder.headers_mut() {
            headers.extend(response.headers().clone());
        }
        let body = response.bytes().await?;
        Ok(builder.body(body)?)
    }
}

/// 复制请求（扩展字段不会被保留）
pub fn clone_request(request: &HttpRequest) -> HttpRequest {
    let mut cloned = http::Request::new(request.body().clone());
    *cloned.method_mut() = request.method().clone();
    *cloned.uri_mut() = request.uri().clone();
    *cloned.version_mut() = request.version();
    *cloned.headers_mut() = request.headers().clone();
    cloned
}

/// 负载均衡请求工厂
///
/// 把逻辑请求转换为针对具体实例的请求动作：重写URI、依次应用转换器、通过传输层发送
#[derive(Clone, Default)]
pub struct LoadBalancerRequestFactory {
    transformers: Vec<Arc<dyn LoadBalancerRequestTransformer>>,
}

impl LoadBalancerRequestFactory {
    pub fn new(transformers: Vec<Arc<dyn LoadBalancerRequestTransformer>>) -> Self {
        Self { transformers }
    }

    pub fn create_request(
        &self,
        request: HttpRequest,
        transport: Arc<dyn HttpTransport>,
    ) -> HttpLoadBalancerRequest {
        HttpLoadBalancerRequest {
            request,
            transport,
            transformers: self.transformers.clone(),
        }
    }
}

/// 由工厂创建的 HTTP 请求动作
pub struct HttpLoadBalancerRequest {
    request: HttpRequest,
    transport: Arc<dyn HttpTransport>,
    transformers: Vec<Arc<dyn LoadBalancerRequestTransformer>>,
}

impl HttpLoadBalancerRequest {
    pub fn method(&self) -> &http::Method {
        self.request.method()
    }

    /// 针对实例构建最终要发送的请求
    pub fn prepare(&self, instance: &ServiceInstance) -> Result<HttpRequest, Error> {
        let original = Url::parse(&self.request.uri().to_string())?;
        let uri: http::Uri = reconstruct_uri(instance, &original)?.as_str().parse()?;

        let mut request = clone_request(&self.request);
        *request.uri_mut() = uri;
        for transformer in &self.transformers {
            request = transformer.transform(request, instance);
        }
        Ok(request)
    }
}

#[async_trait]
impl LoadBalancerRequest<HttpResponse> for HttpLoadBalancerRequest {
    async fn apply(&self, instance: &ServiceInstance) -> Result<HttpResponse, Error> {
        let request = self.prepare(instance)?;
        debug!("{} {}", request.method(), request.uri());
        self.transport.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderValue, Method};
    use std::sync::Mutex;

    struct HeaderTransformer(&'static str);

    impl LoadBalancerRequestTransformer for HeaderTransformer {
        fn transform(&self, mut request: HttpRequest, instance: &ServiceInstance) -> HttpRequest {
            let previous = request
                .headers()
                .get("x-trail")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            let trail = format!("{}{}@{}", previous, self.0, instance.port);
            if let Ok(value) = HeaderValue::from_str(&trail) {
                request.headers_mut().insert("x-trail", value);
            }
            request
        }
    }

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<(String, Option<String>)>>,
    }

    #[async_trait]
    impl HttpTransport for RecordingTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, Error> {
            let trail = request
                .headers()
                .get("x-trail")
                .and_then(|v| v.to_str().ok())
                .map(String::from);
            self.sent.lock().unwrap().push((request.uri().to_string(), trail));
            Ok(http::Response::builder()
                .status(200)
                .body(Bytes::from_static(b"ok"))
                .unwrap())
        }
    }

    #[tokio::test]
    async fn test_request_rewritten_and_transformed_in_order() {
        let transport = Arc::new(RecordingTransport::default());
        let factory = LoadBalancerRequestFactory::new(vec![
            Arc::new(HeaderTransformer("a")),
            Arc::new(HeaderTransformer("b")),
        ]);

        let request = http::Request::builder()
            .method(Method::GET)
            .uri("http://user-service/api/v1/users?active=true")
            .body(Bytes::new())
            .unwrap();
        let lb_request = factory.create_request(request, transport.clone());
        assert_eq!(lb_request.method(), Method::GET);

        let instance = ServiceInstance::new("user-service", "10.0.0.5", 8081, false);
        let response = lb_request.apply(&instance).await.unwrap();
        assert_eq!(response.status(), 200);

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "http://10.0.0.5:8081/api/v1/users?active=true");
        assert_eq!(sent[0].1.as_deref(), Some("a@8081b@8081"));
    }

    #[tokio::test]
    async fn test_request_fn() {
        let request = request_fn(|instance: ServiceInstance| async move { Ok(instance.port) });
        let instance = ServiceInstance::new("user-service", "10.0.0.5", 8081, false);
        assert_eq!(request.apply(&instance).await.unwrap(), 8081);
    }

    #[test]
    fn test_clone_request_keeps_headers_and_body() {
        let request = http::Request::builder()
            .method(Method::POST)
            .uri("http://user-service/users")
            .header("content-type", "application/json")
            .body(Bytes::from_static(b"{}"))
            .unwrap();
        let cloned = clone_request(&request);
        assert_eq!(cloned.method(), Method::POST);
        assert_eq!(cloned.uri(), request.uri());
        assert_eq!(cloned.headers()["content-type"], "application/json");
        assert_eq!(cloned.body(), &Bytes::from_static(b"{}"));
    }
}
