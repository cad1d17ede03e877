use std::sync::atomic::{AtomicU16, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::configs::AutoRegistrationConfig;
use crate::service::ShutdownHook;
use crate::service_register_center::{Registration, ServiceRegistry};
use crate::Error;

/// 管理上下文的命名空间，来自该上下文的监听器就绪通知会被忽略
pub const MANAGEMENT_NAMESPACE: &str = "management";

/// 自动注册的生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecycleState {
    Stopped = 0,
    Starting = 1,
    Running = 2,
}

impl LifecycleState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => LifecycleState::Starting,
            2 => LifecycleState::Running,
            _ => LifecycleState::Stopped,
        }
    }
}

/// 监听器就绪通知
#[derive(Debug, Clone)]
pub struct WebServerInitializedEvent {
    pub port: u16,
    pub namespace: Option<String>,
}

impl WebServerInitializedEvent {
    pub fn new(port: u16) -> Self {
        Self { port, namespace: None }
    }

    pub fn with_namespace(port: u16, namespace: impl Into<String>) -> Self {
        Self {
            port,
            namespace: Some(namespace.into()),
        }
    }
}

/// 注册过程中发布的通知
#[derive(Debug, Clone)]
pub enum RegistrationEvent {
    /// 即将注册，携带待注册信息
    PreRegistered(Registration),
    /// 注册完成，携带生命周期的配置快照
    Registered(Arc<AutoRegistrationConfig>),
}

/// 服务自动注册
///
/// 监听器就绪后把当前服务注册到注册中心，进程关闭时注销。
/// `start`/`stop` 可以被并发调用，状态切换只会被执行一次。
/// 注册进行中调用 `stop` 会等待注册完成后再注销
pub struct AutoServiceRegistration<S: ServiceRegistry> {
    registry: Arc<S>,
    config: Arc<AppConfig>,
    state: AtomicU8,
    // start/stop 互斥
    transition: AsyncMutex<()>,
    port: AtomicU16,
    registration: Mutex<Option<Registration>>,
    events: broadcast::Sender<RegistrationEvent>,
}

impl<S: ServiceRegistry + 'static> AutoServiceRegistration<S> {
    pub fn new(registry: Arc<S>, config: Arc<AppConfig>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            registry,
            config,
            state: AtomicU8::new(LifecycleState::Stopped as u8),
            transition: AsyncMutex::new(()),
            port: AtomicU16::new(0),
            registration: Mutex::new(None),
            events,
        }
    }

    pub fn registry(&self) -> &Arc<S> {
        &self.registry
    }

    pub fn is_enabled(&self) -> bool {
        self.config.registration.enabled
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_running(&self) -> bool {
        self.state() == LifecycleState::Running
    }

    /// 已记录的监听端口，未收到通知时为 0
    pub fn port(&self) -> u16 {
        self.port.load(Ordering::SeqCst)
    }

    /// 订阅注册通知
    pub fn subscribe(&self) -> broadcast::Receiver<RegistrationEvent> {
        self.events.subscribe()
    }

    /// 当前的主注册信息，`start` 之前为空
    pub fn registration(&self) -> Option<Registration> {
        self.registration
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// 管理端点的注册信息
    ///
    /// 只有开启了管理端点注册、配置了管理端口并且与主端口不同时才存在
    pub fn management_registration(&self, registration: &Registration) -> Option<Registration> {
        let config = &self.config.registration;
        if !config.register_management {
            return None;
        }
        config
            .management_port
            .filter(|port| *port != registration.port)
            .map(|port| registration.management(port, &config.management_suffix))
    }

    /// 处理监听器就绪通知
    ///
    /// 只有第一次通知会记录端口并触发注册，管理上下文的通知被忽略
    pub async fn on_web_server_initialized(&self, event: WebServerInitializedEvent) -> Result<(), Error> {
        if event.namespace.as_deref() == Some(MANAGEMENT_NAMESPACE) {
            debug!("忽略管理上下文的就绪通知, 端口: {}", event.port);
            return Ok(());
        }
        if event.port == 0 {
            warn!("忽略端口为 0 的就绪通知");
            return Ok(());
        }
        if self
            .port
            .compare_exchange(0, event.port, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("端口已记录为 {}, 忽略新的就绪通知: {}", self.port(), event.port);
            return Ok(());
        }
        self.start().await
    }

    /// 在后台任务中消费就绪通知
    pub fn listen(self: Arc<Self>, mut rx: mpsc::Receiver<WebServerInitializedEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(e) = self.on_web_server_initialized(event).await {
                    error!("服务自动注册失败: {}", e);
                }
            }
        })
    }

    /// 注册服务
    ///
    /// 注册失败时状态仍切换为 `Running` 并返回错误，重复调用不会再次尝试
    pub async fn start(&self) -> Result<(), Error> {
        if !self.is_enabled() {
            debug!("服务自动注册已禁用");
            return Ok(());
        }
        if self.port() == 0 && self.config.registration.port.is_none() {
            debug!("尚未获得监听端口，跳过服务注册");
            return Ok(());
        }

        let _transition = self.transition.lock().await;
        if self
            .state
            .compare_exchange(
                LifecycleState::Stopped as u8,
                LifecycleState::Starting as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            debug!("服务自动注册已启动");
            return Ok(());
        }

        let result = self.register().await;
        self.state
            .store(LifecycleState::Running as u8, Ordering::SeqCst);
        result
    }

    async fn register(&self) -> Result<(), Error> {
        let registration = Registration::from_config(&self.config, self.port());
        *self.registration.lock().unwrap_or_else(|e| e.into_inner()) = Some(registration.clone());

        let _ = self
            .events
            .send(RegistrationEvent::PreRegistered(registration.clone()));

        self.registry.register(&registration).await?;
        info!(
            "服务注册成功: {} ({}:{})",
            registration.id, registration.host, registration.port
        );

        if let Some(management) = self.management_registration(&registration) {
            self.registry.register(&management).await?;
            info!("管理端点注册成功: {} (端口: {})", management.id, management.port);
        }

        let _ = self.events.send(RegistrationEvent::Registered(Arc::new(
            self.config.registration.clone(),
        )));
        Ok(())
    }

    /// 注销服务并关闭注册中心连接
    ///
    /// 每一步都会执行，返回第一个错误
    pub async fn stop(&self) -> Result<(), Error> {
        let _transition = self.transition.lock().await;
        if self
            .state
            .compare_exchange(
                LifecycleState::Running as u8,
                LifecycleState::Stopped as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            return Ok(());
        }
        if !self.is_enabled() {
            return Ok(());
        }

        let mut first_error = None;
        if let Some(registration) = self.registration() {
            match self.registry.deregister(&registration).await {
                Ok(_) => info!("已从注册中心注销服务: {}", registration.id),
                Err(e) => {
                    error!("从注册中心注销服务失败: {}", e);
                    first_error.get_or_insert(e);
                }
            }
            if let Some(management) = self.management_registration(&registration) {
                if let Err(e) = self.registry.deregister(&management).await {
                    error!("注销管理端点失败: {}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Err(e) = self.registry.close().await {
            error!("关闭注册中心连接失败: {}", e);
            first_error.get_or_insert(e);
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub async fn set_status(&self, status: &str) -> Result<(), Error> {
        let registration = self
            .registration()
            .ok_or_else(|| Error::RegistrationFailed("服务尚未注册".to_string()))?;
        self.registry.set_status(&registration, status).await
    }

    pub async fn get_status(&self) -> Result<S::Status, Error> {
        let registration = self
            .registration()
            .ok_or_else(|| Error::RegistrationFailed("服务尚未注册".to_string()))?;
        self.registry.get_status(&registration).await
    }
}

#[async_trait]
impl<S: ServiceRegistry + 'static> ShutdownHook for AutoServiceRegistration<S> {
    fn name(&self) -> &str {
        "auto-service-registration"
    }

    async fn shutdown(&self) -> Result<(), Error> {
        self.stop().await
    }
}
