use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use crate::Error;

/// 进程退出前需要执行的清理动作，例如从注册中心注销
#[async_trait]
pub trait ShutdownHook: Send + Sync {
    fn name(&self) -> &str;

    async fn shutdown(&self) -> Result<(), Error>;
}

/// 关闭钩子集合
///
/// 钩子按注册的相反顺序执行，每个钩子只执行一次
#[derive(Default)]
pub struct ShutdownHooks {
    hooks: Mutex<Vec<Arc<dyn ShutdownHook>>>,
}

impl ShutdownHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, hook: Arc<dyn ShutdownHook>) {
        let mut hooks = self.hooks.lock().unwrap_or_else(|e| e.into_inner());
        info!("注册关闭钩子: {}", hook.name());
        hooks.push(hook);
    }

    pub fn len(&self) -> usize {
        self.hooks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 执行并清空所有钩子，单个钩子失败不影响其余钩子
    pub async fn run_all(&self) {
        let hooks: Vec<_> = {
            let mut hooks = self.hooks.lock().unwrap_or_else(|e| e.into_inner());
            hooks.drain(..).rev().collect()
        };

        for hook in hooks {
            match hook.shutdown().await {
                Ok(_) => info!("关闭钩子执行完成: {}", hook.name()),
                Err(e) => error!("关闭钩子执行失败: {}: {}", hook.name(), e),
            }
        }
    }
}

// 进程级关闭钩子，保证退出前先注销
pub static SHUTDOWN_HOOKS: Lazy<ShutdownHooks> = Lazy::new(ShutdownHooks::new);

/// 等待 Ctrl+C 或 SIGTERM
pub async fn wait_for_signal() {
    use tokio::signal;

    // 监听 Ctrl+C 信号
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("无法安装Ctrl+C处理器: {}", e);
            std::future::pending::<()>().await;
        }
    };

    // 在Unix系统上监听 SIGTERM 信号
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("无法安装SIGTERM处理器: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    // 在非Unix系统上创建一个永不返回的future
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    // 等待任一信号
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// 处理优雅关闭
///
/// 监听关闭信号，收到信号后执行所有关闭钩子（注销服务），再通知服务器关闭
///
/// # 参数
/// * `tx` - 关闭通知发送端
/// * `hooks` - 需要执行的关闭钩子
pub async fn shutdown_signal(tx: oneshot::Sender<()>, hooks: &ShutdownHooks) -> Result<(), Error> {
    wait_for_signal().await;
    info!("接收到关闭信号，准备优雅关闭...");

    hooks.run_all().await;

    // 发送关闭信号通知服务器关闭
    if tx.send(()).is_err() {
        warn!("无法发送关闭信号，接收端可能已关闭");
    }

    info!("服务关闭准备完成");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingHook {
        name: String,
        order: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl ShutdownHook for RecordingHook {
        fn name(&self) -> &str {
            &self.name
        }

        async fn shutdown(&self) -> Result<(), Error> {
            self.order.lock().unwrap().push(self.name.clone());
            if self.fail {
                return Err(Error::RegistrationFailed("registry down".into()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_hooks_run_in_reverse_order_once() {
        let hooks = ShutdownHooks::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for (name, fail) in [("first", false), ("second", true), ("third", false)] {
            hooks.register(Arc::new(RecordingHook {
                name: name.to_string(),
                order: order.clone(),
                fail,
            }));
        }
        assert_eq!(hooks.len(), 3);

        hooks.run_all().await;
        hooks.run_all().await;

        assert_eq!(*order.lock().unwrap(), vec!["third", "second", "first"]);
        assert!(hooks.is_empty());
    }
}
