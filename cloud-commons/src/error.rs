use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// 发现提供者无法应答，在组合发现中只降级该提供者
    #[error("注册中心不可达: {0}")]
    RegistryUnreachable(String),

    /// 负载均衡器找不到任何候选实例
    #[error("没有可用的服务实例: {0}")]
    NoInstanceAvailable(String),

    /// 请求执行器无法为服务解析出实例
    #[error("服务不可用: {0}")]
    ServiceUnavailable(String),

    /// 网络/传输层失败（连接拒绝、超时、IO错误），可按策略重试
    #[error("传输错误: {0}")]
    Transport(String),

    /// 注册中心拒绝了注册或注销
    #[error("服务注册失败: {0}")]
    RegistrationFailed(String),

    #[error("无效的URI: {0}")]
    InvalidUri(String),

    #[error("配置错误: {0}")]
    Config(#[from] config::ConfigError),

    #[error("HTTP错误: {0}")]
    Http(#[from] http::Error),

    #[error("内部服务错误: {0}")]
    Internal(String),
}

impl Error {
    /// 只有传输层失败被视为可重试
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Error::Internal(err)
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Error::Internal(err.to_string())
    }
}

// reqwest 错误统一视为传输失败
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidUri(err.to_string())
    }
}

impl From<http::uri::InvalidUri> for Error {
    fn from(err: http::uri::InvalidUri) -> Self {
        Error::InvalidUri(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
