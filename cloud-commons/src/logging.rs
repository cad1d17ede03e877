use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

// 日志输出格式类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    // 普通文本格式
    Plain,
    // JSON格式，适合ELK等日志聚合系统
    Json,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Plain,
        }
    }
}

/// 使用默认级别初始化日志系统
///
/// # 示例
/// ```no_run
/// use cloud_commons::logging;
///
/// fn main() -> anyhow::Result<()> {
///     logging::init()?;
///     tracing::info!("日志系统初始化成功");
///     Ok(())
/// }
/// ```
pub fn init() -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(env_filter)
        .with_ansi(true)
        .with_thread_names(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("初始化日志系统失败: {}", e))?;

    info!("日志系统初始化成功");
    Ok(())
}

/// 从配置初始化日志系统
///
/// 环境变量 `RUST_LOG` 优先于配置文件中的级别
pub fn init_from_config(config: &crate::config::AppConfig) -> Result<()> {
    let filter_string = config.log.filter_directives();

    // 检查环境变量是否有覆盖设置
    let env_filter = match std::env::var("RUST_LOG") {
        Ok(directives) => EnvFilter::new(directives),
        Err(_) => EnvFilter::new(&filter_string),
    };

    let log_format = config
        .log
        .format
        .as_deref()
        .map(LogFormat::parse)
        .unwrap_or(LogFormat::Plain);

    // 根据配置的输出格式选择日志输出方式
    let result = match log_format {
        LogFormat::Plain => fmt()
            .with_env_filter(env_filter)
            .with_ansi(true)
            .with_thread_names(true)
            .try_init(),
        LogFormat::Json => fmt()
            .with_env_filter(env_filter)
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_thread_names(true)
            .try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("初始化日志系统失败: {}", e))?;

    info!(filter = %filter_string, format = ?log_format, "日志系统从配置初始化成功");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configs::LogConfig;
    use std::collections::HashMap;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("plain"), LogFormat::Plain);
        assert_eq!(LogFormat::parse("whatever"), LogFormat::Plain);
    }

    #[test]
    fn test_filter_directives() {
        let mut components = HashMap::new();
        components.insert("cloud_commons".to_string(), "debug".to_string());
        components.insert("reqwest".to_string(), "warn".to_string());
        let log = LogConfig {
            level: "info".to_string(),
            components: Some(components),
            format: None,
        };
        assert_eq!(log.filter_directives(), "info,cloud_commons=debug,reqwest=warn");
        assert_eq!(log.component_level("reqwest"), Some("warn"));
        assert_eq!(log.level(), tracing::Level::INFO);
    }
}
