use config::{Config, ConfigError, File, FileFormat};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::info;

use crate::configs::{AutoRegistrationConfig, DiscoveryConfig, LogConfig, RetryConfig};

// 定义一个静态全局配置，可以在任何地方访问
pub static GLOBAL_CONFIG: Lazy<RwLock<Option<Arc<AppConfig>>>> = Lazy::new(|| RwLock::new(None));

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "./config/config.yaml";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub application: ApplicationConfig,
    pub log: LogConfig,
    pub discovery: DiscoveryConfig,
    pub loadbalancer: LoadBalancerConfig,
    pub registration: AutoRegistrationConfig,
}

/// 当前应用的基本信息
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApplicationConfig {
    pub name: String,
    pub host: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: "application".to_string(),
            host: "127.0.0.1".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct LoadBalancerConfig {
    pub retry: RetryConfig,
}

impl AppConfig {
    // 创建一个新的AppConfig实例
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_file(None)
    }

    // 从多个来源加载配置
    pub fn from_file(file_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // 1. 配置文件 (如果指定)，否则使用默认配置文件
        let path = file_path.unwrap_or(DEFAULT_CONFIG_PATH);
        if Path::new(path).exists() {
            let format = if path.ends_with(".json") {
                FileFormat::Json
            } else if path.ends_with(".yaml") || path.ends_with(".yml") {
                FileFormat::Yaml
            } else {
                FileFormat::Toml
            };

            builder = builder.add_source(File::with_name(path).format(format));
        } else if file_path.is_some() {
            return Err(ConfigError::NotFound(path.to_string()));
        }

        // 2. 读取环境变量 (最高优先级)，例如 APP__LOADBALANCER__RETRY__ENABLED=false
        builder = builder.add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__"),
        );

        builder.build()?.try_deserialize()
    }

    /// 从YAML字符串加载配置
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(content, FileFormat::Yaml))
            .build()?
            .try_deserialize()
    }

    /// 注册使用的服务名
    pub fn service_name(&self) -> &str {
        self.registration
            .service_name
            .as_deref()
            .unwrap_or(&self.application.name)
    }
}

/// 全局配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    // 初始化全局配置单例
    pub fn init_global(file_path: Option<&str>) -> Result<Arc<AppConfig>, ConfigError> {
        let config = Arc::new(AppConfig::from_file(file_path)?);
        Self::set_global_arc(config.clone());
        info!("全局配置已加载: {}", config.application.name);
        Ok(config)
    }

    // 获取全局配置单例
    pub fn get_global() -> Option<Arc<AppConfig>> {
        GLOBAL_CONFIG
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    // 设置新的全局配置
    pub fn set_global(config: AppConfig) {
        Self::set_global_arc(Arc::new(config));
    }

    fn set_global_arc(config: Arc<AppConfig>) {
        let mut config_guard = GLOBAL_CONFIG.write().unwrap_or_else(|e| e.into_inner());
        *config_guard = Some(config);
    }
}
