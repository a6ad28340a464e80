//! 优雅关闭
//!
//! Ctrl+C / SIGTERM（docker stop）或后台任务意外退出都会触发关闭；
//! 只记录第一个原因，之后的触发只负责取消 token。

use std::fmt;
use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;

/// 关闭原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Ctrl+C
    UserInitiated,
    /// SIGTERM
    Signal,
    /// 活动监控或运维接口异常退出
    FatalError(String),
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::UserInitiated => write!(f, "interrupted"),
            ShutdownReason::Signal => write!(f, "terminated"),
            ShutdownReason::FatalError(msg) => write!(f, "fatal: {}", msg),
        }
    }
}

/// 关闭协调器：一个 CancellationToken + 首个关闭原因
#[derive(Debug, Default)]
pub struct ShutdownManager {
    token: CancellationToken,
    reason: OnceLock<ShutdownReason>,
}

impl ShutdownManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 交给后台任务的 token
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// 触发关闭；重复触发不会覆盖第一个原因
    pub fn shutdown(&self, reason: ShutdownReason) {
        match self.reason.set(reason) {
            Ok(()) => {
                if let Some(reason) = self.reason.get() {
                    tracing::info!("Shutting down ({})", reason);
                }
            }
            Err(late) => tracing::debug!("Shutdown already in progress, ignoring: {}", late),
        }
        self.token.cancel();
    }

    pub fn reason(&self) -> Option<&ShutdownReason> {
        self.reason.get()
    }

    /// 等到关闭被触发，返回首个原因
    pub async fn wait_for_shutdown(&self) -> Option<&ShutdownReason> {
        self.token.cancelled().await;
        self.reason()
    }

    /// 后台等待 Ctrl+C 或 SIGTERM，收到后触发关闭
    pub fn install_signal_handlers(self: &Arc<Self>) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                reason = wait_for_signal() => manager.shutdown(reason),
                _ = manager.token.cancelled() => {}
            }
        });
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> ShutdownReason {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("Cannot listen for SIGTERM, only Ctrl+C will stop sleeper: {}", e);
            return wait_for_ctrl_c().await;
        }
    };
    tokio::select! {
        reason = wait_for_ctrl_c() => reason,
        _ = sigterm.recv() => ShutdownReason::Signal,
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> ShutdownReason {
    wait_for_ctrl_c().await
}

async fn wait_for_ctrl_c() -> ShutdownReason {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    ShutdownReason::UserInitiated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_cancels_token() {
        let manager = ShutdownManager::new();
        let token = manager.token();
        assert!(manager.reason().is_none());
        manager.shutdown(ShutdownReason::Signal);
        assert!(token.is_cancelled());
        assert_eq!(manager.reason(), Some(&ShutdownReason::Signal));
    }

    #[tokio::test]
    async fn test_first_reason_wins() {
        let manager = Arc::new(ShutdownManager::new());
        let waiter = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.wait_for_shutdown().await.cloned() })
        };

        manager.shutdown(ShutdownReason::FatalError("activity monitor exited".into()));
        manager.shutdown(ShutdownReason::Signal);

        assert_eq!(
            waiter.await.unwrap(),
            Some(ShutdownReason::FatalError("activity monitor exited".into()))
        );
        assert_eq!(
            manager.reason().map(ToString::to_string).as_deref(),
            Some("fatal: activity monitor exited")
        );
    }
}
