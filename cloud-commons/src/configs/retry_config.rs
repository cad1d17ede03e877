use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;

/// 负载均衡重试配置
///
/// 对应配置文件中的 `loadbalancer.retry` 节点，启动时加载一次，请求期间只读
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetryConfig {
    /// 总开关，false 时完全禁用负载均衡层面的重试
    pub enabled: bool,
    /// 默认只对 GET 请求进行重试
    pub retry_on_all_operations: bool,
    /// 在同一实例上的重试次数
    pub max_retries_on_same_service_instance: u32,
    /// 重新选择实例后的重试次数
    pub max_retries_on_next_service_instance: u32,
    /// 额外触发重试的HTTP状态码
    pub retryable_status_codes: HashSet<u16>,
    /// 退避策略
    pub backoff: BackoffConfig,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            retry_on_all_operations: false,
            max_retries_on_same_service_instance: 0,
            max_retries_on_next_service_instance: 1,
            retryable_status_codes: HashSet::new(),
            backoff: BackoffConfig::default(),
        }
    }
}

impl RetryConfig {
    /// 一次逻辑调用最多的尝试次数
    pub fn max_attempts(&self) -> u32 {
        1u32.saturating_add(self.max_retries_on_same_service_instance)
            .saturating_add(self.max_retries_on_next_service_instance)
    }
}

/// 退避配置
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BackoffConfig {
    pub enabled: bool,
    /// 第一次重试的最小等待时间（毫秒）
    pub min_backoff_ms: u64,
    /// 等待时间上限（毫秒）
    pub max_backoff_ms: u64,
    /// 抖动因子，取值 [0, 1)
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_backoff_ms: 5,
            max_backoff_ms: u64::MAX,
            jitter: 0.5,
        }
    }
}

impl BackoffConfig {
    pub fn min_backoff(&self) -> Duration {
        Duration::from_millis(self.min_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}
