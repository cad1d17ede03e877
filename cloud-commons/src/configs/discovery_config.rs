use std::collections::HashMap;

use serde::Deserialize;

/// 服务发现配置
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub enabled: bool,
    /// 存在其他发现提供者时是否启用组合发现
    pub composite_enabled: bool,
    pub simple: SimpleDiscoveryConfig,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            composite_enabled: true,
            simple: SimpleDiscoveryConfig::default(),
        }
    }
}

/// 静态服务发现配置
///
/// ```yaml
/// discovery:
///   simple:
///     instances:
///       user-service:
///         - uri: http://localhost:8081
///           metadata:
///             zone: zone1
/// ```
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SimpleDiscoveryConfig {
    pub order: i32,
    pub instances: HashMap<String, Vec<SimpleInstanceConfig>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SimpleInstanceConfig {
    pub uri: String,
    pub instance_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}
