//! 活动监控：固定周期对账 + 闲置休眠
//!
//! 每个周期：
//! 1. 发现成员及实际状态
//! 2. all_running = 成员数 > 0 且全部 running
//! 3. all_running 且跟踪为 Down → Up（检测带外启动）
//! 4. 非 all_running 且跟踪为 Up → Down（检测崩溃 / 手动停止）
//! 5. 跟踪为 Up 且闲置超过 sleep_timeout → stop_all 并置 Down
//!
//! 发现失败只记日志、跳过本轮，绝不因单次探测失败翻转状态。
//! 步骤 1-4 由 LifecycleController::reconcile 在生命周期锁内完成。

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::controller::{LifecycleController, Transition};

/// 默认对账周期
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(10);

/// 单轮对账结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// 发现失败，本轮跳过
    Skipped,
    Reconciled {
        transition: Option<Transition>,
        slept: bool,
    },
}

pub struct ActivityMonitor {
    controller: Arc<LifecycleController>,
    check_interval: Duration,
    sleep_timeout: Duration,
}

impl ActivityMonitor {
    pub fn new(controller: Arc<LifecycleController>, sleep_timeout: Duration) -> Self {
        Self {
            controller,
            check_interval: DEFAULT_CHECK_INTERVAL,
            sleep_timeout,
        }
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    /// 执行一轮对账
    pub async fn tick(&self) -> CycleOutcome {
        let transition = match self.controller.reconcile().await {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!("Failed to get project containers: {}", e);
                return CycleOutcome::Skipped;
            }
        };

        let slept = if self.controller.is_up() {
            match self.controller.sleep_if_idle(self.sleep_timeout).await {
                Ok(Some(report)) => {
                    tracing::info!(
                        "Containers stopped ({} stopped, {} failed)",
                        report.acted,
                        report.failed.len()
                    );
                    true
                }
                Ok(None) => false,
                Err(e) => {
                    tracing::warn!("Failed to stop containers: {}", e);
                    false
                }
            }
        } else {
            false
        };

        CycleOutcome::Reconciled { transition, slept }
    }

    /// 周期运行，直到 token 被取消
    pub async fn run(self, token: CancellationToken) {
        let mut interval = tokio::time::interval(self.check_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await; // 跳过启动后立即执行

        tracing::info!(
            "Activity monitor started for project '{}' (checking every {}s, sleep after {}s)",
            self.controller.project(),
            self.check_interval.as_secs(),
            self.sleep_timeout.as_secs()
        );

        loop {
            if token.is_cancelled() {
                break;
            }
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }

        tracing::info!("Activity monitor stopped");
    }

    /// 在后台任务中运行
    pub fn spawn(self, token: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run(token))
    }
}
