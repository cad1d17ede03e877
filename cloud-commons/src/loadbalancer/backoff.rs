use std::time::Duration;

use rand::Rng;

use crate::configs::BackoffConfig;

/// 计算第 `retry` 次重试（从1开始）前的等待时间
///
/// 基础值为 `min * 2^(retry-1)`，限制在 `[min, max]` 内，再按 `jitter` 比例随机抖动。
/// 未开启退避时返回零
pub fn calculate_backoff(config: &BackoffConfig, retry: u32) -> Duration {
    if !config.enabled {
        return Duration::ZERO;
    }

    let min = config.min_backoff().as_nanos();
    // max 小于 min 时按 min 处理
    let max = config.max_backoff().as_nanos().max(min);

    let exponent = retry.saturating_sub(1).min(127);
    let base = min.saturating_mul(1u128 << exponent).clamp(min, max);

    let delay = if config.jitter > 0.0 {
        let jitter = config.jitter.min(1.0);
        let factor = 1.0 + jitter * rand::rng().random_range(-1.0..=1.0);
        ((base as f64 * factor) as u128).clamp(min, max)
    } else {
        base
    };

    nanos_to_duration(delay)
}

fn nanos_to_duration(nanos: u128) -> Duration {
    let secs = nanos / 1_000_000_000;
    if secs > u64::MAX as u128 {
        return Duration::MAX;
    }
    Duration::new(secs as u64, (nanos % 1_000_000_000) as u32)
}
