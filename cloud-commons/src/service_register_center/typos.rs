// 导入 serde 用于序列化和反序列化
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::service_discovery::ServiceInstance;

/// 服务注册信息
///
/// 包含向服务注册中心注册服务所需的所有信息
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct Registration {
    /// 服务实例的唯一标识
    pub id: String,
    /// 服务名称
    pub name: String,
    /// 服务主机地址
    pub host: String,
    /// 服务端口号
    pub port: u16,
    /// 是否使用https
    pub secure: bool,
    /// 服务标签，用于分类和过滤
    pub tags: Vec<String>,
    /// 实例元数据
    pub metadata: HashMap<String, String>,
}

impl Registration {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        let name = name.into();
        let host = host.into();
        Self {
            id: format!("{}-{}-{}", name, host, port),
            name,
            host,
            port,
            ..Default::default()
        }
    }

    /// 根据配置和实际监听端口构建主注册信息，配置中的端口优先
    pub fn from_config(config: &AppConfig, port: u16) -> Self {
        let registration = &config.registration;
        let host = registration
            .host
            .clone()
            .unwrap_or_else(|| config.application.host.clone());
        let port = registration.port.unwrap_or(port);

        let mut result = Self::new(config.service_name(), host, port);
        result.secure = registration.secure;
        result.tags = registration.tags.clone();
        result.metadata = registration.metadata.clone();
        result
    }

    /// 管理端点的注册信息，ID和名称追加 `:<suffix>`
    pub fn management(&self, port: u16, suffix: &str) -> Self {
        Self {
            id: format!("{}:{}", self.id, suffix),
            name: format!("{}:{}", self.name, suffix),
            port,
            ..self.clone()
        }
    }

    pub fn service_instance(&self) -> ServiceInstance {
        ServiceInstance::new(self.name.clone(), self.host.clone(), self.port, self.secure)
            .with_instance_id(self.id.clone())
            .with_metadata(self.metadata.clone())
    }
}

impl From<&Registration> for ServiceInstance {
    fn from(registration: &Registration) -> Self {
        registration.service_instance()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let config = AppConfig::from_yaml_str(
            r#"
application:
  name: user-service
  host: 10.0.0.5
registration:
  tags: [v1]
  metadata:
    zone: zone1
"#,
        )
        .unwrap();

        let registration = Registration::from_config(&config, 8081);
        assert_eq!(registration.id, "user-service-10.0.0.5-8081");
        assert_eq!(registration.name, "user-service");
        assert_eq!(registration.port, 8081);
        assert_eq!(registration.tags, vec!["v1".to_string()]);
        assert_eq!(registration.metadata["zone"], "zone1");

        let instance = registration.service_instance();
        assert_eq!(instance.service_id, "user-service");
        assert_eq!(instance.instance_id.as_deref(), Some("user-service-10.0.0.5-8081"));
    }

    #[test]
    fn test_configured_port_and_host_override() {
        let config = AppConfig::from_yaml_str(
            r#"
application:
  name: user-service
registration:
  service_name: users
  host: users.internal
  port: 9000
"#,
        )
        .unwrap();

        let registration = Registration::from_config(&config, 8081);
        assert_eq!(registration.name, "users");
        assert_eq!(registration.host, "users.internal");
        assert_eq!(registration.port, 9000);
    }

    #[test]
    fn test_management_registration() {
        let registration = Registration::new("user-service", "10.0.0.5", 8081);
        let management = registration.management(9091, "management");
        assert_eq!(management.id, "user-service-10.0.0.5-8081:management");
        assert_eq!(management.name, "user-service:management");
        assert_eq!(management.port, 9091);
        assert_eq!(management.host, "10.0.0.5");
    }
}
