use std::sync::Arc;

use http::Method;
use tracing::{debug, info, warn};

use crate::configs::RetryConfig;
use crate::loadbalancer::backoff::calculate_backoff;
use crate::loadbalancer::client::LoadBalancerClient;
use crate::loadbalancer::request::LoadBalancerRequest;
use crate::service_discovery::ServiceInstance;
use crate::Error;

/// 可以按状态码判断是否重试的调用结果
pub trait RetryableOutcome {
    /// 已完成响应的状态码，没有状态码的结果不会因状态码触发重试
    fn status_code(&self) -> Option<u16>;
}

impl<B> RetryableOutcome for http::Response<B> {
    fn status_code(&self) -> Option<u16> {
        Some(self.status().as_u16())
    }
}

/// 负载均衡重试策略
#[derive(Debug, Clone)]
pub struct LoadBalancedRetryPolicy {
    config: Arc<RetryConfig>,
}

impl LoadBalancedRetryPolicy {
    pub fn new(config: Arc<RetryConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// 请求方法是否允许重试，默认只有 GET
    pub fn can_retry_operation(&self, method: &Method) -> bool {
        self.config.enabled && (self.config.retry_on_all_operations || method == Method::GET)
    }

    pub fn is_retryable_status_code(&self, status: u16) -> bool {
        self.config.retryable_status_codes.contains(&status)
    }

    /// 判断一次尝试的结果是否需要重试
    pub fn is_retryable<T: RetryableOutcome>(&self, outcome: &Result<T, Error>) -> bool {
        match outcome {
            Ok(response) => response
                .status_code()
                .is_some_and(|status| self.is_retryable_status_code(status)),
            Err(e) => e.is_retryable(),
        }
    }

    fn has_retries_left(&self, context: &RetryContext) -> bool {
        context.retries < self.config.max_attempts().saturating_sub(1)
    }

    pub fn can_retry_same_instance(&self, context: &RetryContext) -> bool {
        self.has_retries_left(context)
            && context.same_instance_count < self.config.max_retries_on_same_service_instance
    }

    pub fn can_retry_next_instance(&self, context: &RetryContext) -> bool {
        self.has_retries_left(context)
            && context.next_instance_count < self.config.max_retries_on_next_service_instance
    }
}

/// 单次逻辑调用的重试上下文，只在这一次调用（含重试）期间存在
#[derive(Debug, Clone)]
pub struct RetryContext {
    pub service_id: String,
    /// 调用方使用的逻辑URI，例如 `http://user-service/users`
    pub uri: Option<String>,
    /// 最近一次尝试使用的实例
    pub instance: Option<ServiceInstance>,
    /// 当前实例上已重试的次数，切换实例后清零
    pub same_instance_count: u32,
    /// 已切换实例的次数
    pub next_instance_count: u32,
    /// 已发生的重试总次数，用于计算退避时间
    pub retries: u32,
}

impl RetryContext {
    pub fn new(service_id: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            uri: None,
            instance: None,
            same_instance_count: 0,
            next_instance_count: 0,
            retries: 0,
        }
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// 已执行的尝试次数
    pub fn attempts(&self) -> u32 {
        self.retries + 1
    }

    /// 日志中使用的调用目标，`逻辑URI -> 实例地址`
    pub fn target(&self) -> String {
        let uri = self.uri.as_deref().unwrap_or(&self.service_id);
        match &self.instance {
            Some(instance) => format!("{} -> {}", uri, instance.authority()),
            None => uri.to_string(),
        }
    }
}

/// 带重试的请求执行
///
/// 先在同一实例上重试，用完后重新选择实例重试，总尝试次数不超过
/// `1 + 同实例重试次数 + 换实例重试次数`。重试耗尽后返回最后一次尝试的结果
#[derive(Clone)]
pub struct RetryCoordinator {
    client: LoadBalancerClient,
    policy: LoadBalancedRetryPolicy,
}

impl RetryCoordinator {
    pub fn new(client: LoadBalancerClient, config: Arc<RetryConfig>) -> Self {
        Self {
            client,
            policy: LoadBalancedRetryPolicy::new(config),
        }
    }

    pub fn policy(&self) -> &LoadBalancedRetryPolicy {
        &self.policy
    }

    pub async fn execute<T>(
        &self,
        service_id: &str,
        method: &Method,
        request: &dyn LoadBalancerRequest<T>,
    ) -> Result<T, Error>
    where
        T: RetryableOutcome + Send,
    {
        self.execute_with_context(RetryContext::new(service_id), method, request)
            .await
    }

    pub async fn execute_with_context<T>(
        &self,
        mut context: RetryContext,
        method: &Method,
        request: &dyn LoadBalancerRequest<T>,
    ) -> Result<T, Error>
    where
        T: RetryableOutcome + Send,
    {
        let service_id = context.service_id.clone();
        let mut instance = match self.client.choose(&service_id).await {
            Ok(instance) => instance,
            Err(Error::NoInstanceAvailable(_)) => {
                warn!("服务 {} 没有可用实例", service_id);
                return Err(Error::ServiceUnavailable(service_id));
            }
            Err(e) => return Err(e),
        };

        loop {
            let outcome = self
                .client
                .execute_with_instance(&service_id, &instance, request)
                .await;
            context.instance = Some(instance.clone());

            if !self.policy.can_retry_operation(method) || !self.policy.is_retryable(&outcome) {
                return outcome;
            }

            if self.policy.can_retry_same_instance(&context) {
                context.same_instance_count += 1;
                debug!(attempt = context.attempts(), "在同一实例上重试: {}", context.target());
            } else if self.policy.can_retry_next_instance(&context) {
                match self.client.choose(&service_id).await {
                    Ok(next) => {
                        debug!(
                            attempt = context.attempts(),
                            "切换实例重试: {} => {}",
                            context.target(),
                            next.authority()
                        );
                        instance = next;
                    }
                    Err(e) => {
                        warn!("重新选择实例失败，停止重试: {}: {}", context.target(), e);
                        return outcome;
                    }
                }
                context.same_instance_count = 0;
                context.next_instance_count += 1;
            } else {
                info!(
                    attempts = context.attempts(),
                    "重试次数已用完，返回最后一次结果: {}",
                    context.target()
                );
                return outcome;
            }

            context.retries += 1;
            let delay = calculate_backoff(&self.policy.config().backoff, context.retries);
            if !delay.is_zero() {
                debug!("等待 {:?} 后重试", delay);
                tokio::time::sleep(delay).await;
            }
        }
    }
}
