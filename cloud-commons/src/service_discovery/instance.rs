use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// 服务实例
///
/// 由发现提供者产生，创建后不再修改。相等性只比较服务名、主机和端口
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ServiceInstance {
    /// 服务实例的唯一标识
    pub instance_id: Option<String>,
    /// 服务名称
    pub service_id: String,
    /// 服务主机地址
    pub host: String,
    /// 服务端口号
    pub port: u16,
    /// 是否使用https/wss
    pub secure: bool,
    /// 实例元数据
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl ServiceInstance {
    pub fn new(service_id: impl Into<String>, host: impl Into<String>, port: u16, secure: bool) -> Self {
        Self {
            instance_id: None,
            service_id: service_id.into(),
            host: host.into(),
            port,
            secure,
            metadata: HashMap::new(),
        }
    }

    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = Some(instance_id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// 从 `http://host:port` 形式的地址构建实例，未写端口时按协议取 80/443
    pub fn from_uri(service_id: impl Into<String>, uri: &str) -> Result<Self, Error> {
        let url = Url::parse(uri)?;
        let secure = matches!(url.scheme(), "https" | "wss");
        let host = url
            .host_str()
            .ok_or_else(|| Error::InvalidUri(format!("缺少主机地址: {}", uri)))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        let port = url.port().unwrap_or(if secure { 443 } else { 80 });
        Ok(Self::new(service_id, host, port, secure))
    }

    pub fn scheme(&self) -> &'static str {
        if self.secure {
            "https"
        } else {
            "http"
        }
    }

    /// `host:port`，IPv6 地址带方括号
    pub fn authority(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// 实例的规范URI
    pub fn uri(&self) -> Result<Url, Error> {
        Ok(Url::parse(&format!("{}://{}", self.scheme(), self.authority()))?)
    }
}

impl PartialEq for ServiceInstance {
    fn eq(&self, other: &Self) -> bool {
        self.service_id == other.service_id && self.host == other.host && self.port == other.port
    }
}

impl Eq for ServiceInstance {}

impl Hash for ServiceInstance {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.service_id.hash(state);
        self.host.hash(state);
        self.port.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_ignores_metadata_and_scheme() {
        let mut metadata = HashMap::new();
        metadata.insert("zone".to_string(), "zone1".to_string());
        let a = ServiceInstance::new("user-service", "10.0.0.5", 8081, false).with_metadata(metadata);
        let b = ServiceInstance::new("user-service", "10.0.0.5", 8081, true).with_instance_id("b");
        let c = ServiceInstance::new("user-service", "10.0.0.5", 8082, false);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_from_uri() {
        let instance = ServiceInstance::from_uri("user-service", "http://localhost:8081").unwrap();
        assert_eq!(instance.host, "localhost");
        assert_eq!(instance.port, 8081);
        assert!(!instance.secure);

        let instance = ServiceInstance::from_uri("user-service", "https://example.com").unwrap();
        assert_eq!(instance.port, 443);
        assert!(instance.secure);

        let instance = ServiceInstance::from_uri("user-service", "http://[::1]:9000").unwrap();
        assert_eq!(instance.host, "::1");
        assert_eq!(instance.authority(), "[::1]:9000");

        assert!(ServiceInstance::from_uri("user-service", "not a uri").is_err());
    }

    #[test]
    fn test_canonical_uri() {
        let instance = ServiceInstance::new("user-service", "10.0.0.5", 8081, true);
        assert_eq!(instance.uri().unwrap().as_str(), "https://10.0.0.5:8081/");
    }
}
