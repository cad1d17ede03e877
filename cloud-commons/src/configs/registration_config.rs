use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// 自动注册配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AutoRegistrationConfig {
    pub enabled: bool,
    /// 是否把管理端点作为独立实例注册
    pub register_management: bool,
    /// 注册使用的服务名，缺省时使用 application.name
    pub service_name: Option<String>,
    pub host: Option<String>,
    /// 覆盖监听器上报的端口
    pub port: Option<u16>,
    pub secure: bool,
    pub tags: Vec<String>,
    pub metadata: HashMap<String, String>,
    pub management_port: Option<u16>,
    pub management_suffix: String,
}

impl Default for AutoRegistrationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            register_management: true,
            service_name: None,
            host: None,
            port: None,
            secure: false,
            tags: Vec::new(),
            metadata: HashMap::new(),
            management_port: None,
            management_suffix: "management".to_string(),
        }
    }
}
