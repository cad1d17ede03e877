//! 客户端负载均衡：实例选择、请求执行、重试与拦截器

pub mod backoff;
pub mod chooser;
pub mod client;
pub mod interceptor;
pub mod request;
pub mod retry;

pub use chooser::{RandomChooser, RoundRobinChooser, ServiceInstanceChooser};
pub use client::{reconstruct_uri, LoadBalancerClient};
pub use interceptor::{
    load_balancer_interceptor, ClientHttpRequestInterceptor, LoadBalancedHttpClient,
    LoadBalancerInterceptor, RetryLoadBalancerInterceptor,
};
pub use request::{
    request_fn, HttpRequest, HttpResponse, HttpTransport, LoadBalancerRequest,
    LoadBalancerRequestFactory, LoadBalancerRequestTransformer, ReqwestTransport,
};
pub use retry::{LoadBalancedRetryPolicy, RetryContext, RetryCoordinator, RetryableOutcome};
