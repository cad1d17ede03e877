// 导入标准库和必要的依赖
use std::fmt::Debug;

use async_trait::async_trait;
use crate::Error;

// 声明子模块
pub mod in_memory;
pub mod lifecycle;
pub mod typos;

// 导入类型定义
pub use crate::service_register_center::in_memory::InMemoryServiceRegistry;
pub use crate::service_register_center::lifecycle::{
    AutoServiceRegistration, LifecycleState, RegistrationEvent, WebServerInitializedEvent,
};
pub use crate::service_register_center::typos::Registration;

/// 服务注册接口
///
/// 具体的注册中心（Consul、Nacos等）实现该接口后即可接入自动注册流程
#[async_trait]
pub trait ServiceRegistry: Send + Sync + Debug {
    /// `get_status` 返回的状态类型，由具体注册中心决定
    type Status: Send;

    /// 向注册中心注册服务
    ///
    /// # 参数
    /// * `registration` - 包含服务信息的注册对象
    ///
    /// # 返回
    /// 成功返回 Ok(()), 注册中心拒绝时返回 `Error::RegistrationFailed`
    async fn register(&self, registration: &Registration) -> Result<(), Error>;

    /// 从注册中心注销服务
    ///
    /// # 参数
    /// * `registration` - 之前注册过的注册对象
    async fn deregister(&self, registration: &Registration) -> Result<(), Error>;

    /// 关闭与注册中心的连接，释放资源
    async fn close(&self) -> Result<(), Error>;

    /// 设置实例状态，例如 `UP`、`OUT_OF_SERVICE`
    async fn set_status(&self, registration: &Registration, status: &str) -> Result<(), Error>;

    /// 获取实例状态
    async fn get_status(&self, registration: &Registration) -> Result<Self::Status, Error>;
}
