//! 生命周期控制器：对成员集合批量启动 / 停止
//!
//! - start_all / stop_all：尽力而为，单个容器失败只记录，不中断批次；仅发现失败时返回错误
//! - ensure_up：唤醒路径，经生命周期锁单飞（single-flight）
//! - sleep_if_idle：休眠路径，与唤醒共用同一把锁，拿到锁后重新判断是否仍然闲置
//! - reconcile：按实际状态校正跟踪状态，同样持锁，避免用过时的探测结果覆盖刚完成的唤醒 / 休眠
//!
//! 休眠在发出停止之前就置为 Down：停止进行中到达的唤醒会排队等锁，随后重新启动。

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::core::{ActivityState, Result};
use crate::engine::{ContainerEngine, RunState};
use crate::lifecycle::discovery::{Discovery, DiscoveryConfig};

/// 默认停止宽限期（秒）
pub const DEFAULT_STOP_GRACE_SECS: u64 = 10;

/// 对账导致的状态变化
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    WentUp,
    WentDown,
}

/// 单个容器的失败记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    pub id: String,
    pub name: String,
    pub error: String,
}

/// 一次批量启停的结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// 发现到的成员数
    pub considered: usize,
    /// 成功发出的启动 / 停止
    pub acted: usize,
    /// 状态已满足、无需操作
    pub skipped: usize,
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// status() 中单个成员的视图
#[derive(Debug, Clone, Serialize)]
pub struct MemberStatus {
    pub id: String,
    pub name: String,
    pub state: RunState,
}

/// 项目诊断信息
#[derive(Debug, Clone, Serialize)]
pub struct ProjectStatus {
    pub project: String,
    pub up: bool,
    pub idle_secs: u64,
    pub members: Vec<MemberStatus>,
}

pub struct LifecycleController {
    engine: Arc<dyn ContainerEngine>,
    discovery: Discovery,
    state: Arc<ActivityState>,
    stop_grace_secs: u64,
    /// 串行化唤醒与休眠
    lifecycle_lock: Mutex<()>,
}

impl LifecycleController {
    pub fn new(
        engine: Arc<dyn ContainerEngine>,
        discovery: DiscoveryConfig,
        state: Arc<ActivityState>,
    ) -> Self {
        Self {
            discovery: Discovery::new(Arc::clone(&engine), discovery),
            engine,
            state,
            stop_grace_secs: DEFAULT_STOP_GRACE_SECS,
            lifecycle_lock: Mutex::new(()),
        }
    }

    /// 设置停止宽限期
    pub fn with_stop_grace(mut self, secs: u64) -> Self {
        self.stop_grace_secs = secs;
        self
    }

    pub fn project(&self) -> &str {
        self.discovery.project()
    }

    pub fn discovery(&self) -> &Discovery {
        &self.discovery
    }

    pub fn state(&self) -> &Arc<ActivityState> {
        &self.state
    }

    pub fn is_up(&self) -> bool {
        self.state.is_up()
    }

    pub fn record_activity(&self) {
        self.state.record_activity();
    }

    /// 启动所有非 running 的成员；不修改 containers_up（由调用方在成功后标记）
    pub async fn start_all(&self) -> Result<BatchReport> {
        let members = self.discovery.members().await?;
        let mut report = BatchReport {
            considered: members.len(),
            ..Default::default()
        };

        tracing::info!(
            "Starting {} containers in project '{}'",
            members.len(),
            self.project()
        );

        for c in members {
            if c.state.is_running() {
                report.skipped += 1;
                continue;
            }
            tracing::info!("Starting container: {} (state: {})", c.name, c.state);
            match self.engine.start_container(&c.id).await {
                Ok(()) => {
                    tracing::info!("Successfully started: {}", c.name);
                    report.acted += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to start container {}: {}", c.name, e);
                    report.failed.push(BatchFailure {
                        id: c.id,
                        name: c.name,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    /// 停止所有 running 的成员，完成后无论单个结果如何都置 containers_up = false
    pub async fn stop_all(&self) -> Result<BatchReport> {
        let members = self.discovery.members().await?;
        let mut report = BatchReport {
            considered: members.len(),
            ..Default::default()
        };

        tracing::info!(
            "Stopping {} containers in project '{}'",
            members.len(),
            self.project()
        );

        for c in members {
            if !c.state.is_running() {
                report.skipped += 1;
                continue;
            }
            tracing::info!("Stopping container: {}", c.name);
            match self.engine.stop_container(&c.id, self.stop_grace_secs).await {
                Ok(()) => {
                    tracing::info!("Successfully stopped: {}", c.name);
                    report.acted += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to stop container {}: {}", c.name, e);
                    report.failed.push(BatchFailure {
                        id: c.id,
                        name: c.name,
                        error: e.to_string(),
                    });
                }
            }
        }

        // 乐观后置条件：停止失败的残留由下一轮监控纠正
        self.state.set_up(false);
        Ok(report)
    }

    /// 唤醒路径：若已在线直接返回 false；否则启动全部成员并标记在线，返回 true。
    /// 并发调用只有一个真正执行 start_all，其余在锁释放后看到已在线。
    pub async fn ensure_up(&self) -> Result<bool> {
        if self.state.is_up() {
            return Ok(false);
        }
        let _guard = self.lifecycle_lock.lock().await;
        if self.state.is_up() {
            return Ok(false);
        }

        let report = self.start_all().await?;
        if !report.is_clean() {
            tracing::warn!(
                "Project '{}' woke with {} failed starts",
                self.project(),
                report.failed.len()
            );
        }
        self.state.set_up(true);
        Ok(true)
    }

    /// 手动休眠：与唤醒互斥地执行 stop_all
    pub async fn sleep_now(&self) -> Result<BatchReport> {
        let _guard = self.lifecycle_lock.lock().await;
        self.state.set_up(false);
        self.stop_all().await
    }

    /// 休眠路径：拿到锁后重新确认「在线且闲置超过 timeout」，成立才 stop_all。
    /// 返回 Some(report) 表示确实执行了休眠。
    pub async fn sleep_if_idle(&self, timeout: Duration) -> Result<Option<BatchReport>> {
        let _guard = self.lifecycle_lock.lock().await;
        if !self.state.is_up() {
            return Ok(None);
        }
        let idle = self.state.idle_for();
        if idle <= timeout {
            return Ok(None);
        }

        tracing::info!(
            "No activity for {}s (threshold: {}s), putting containers to sleep",
            idle.as_secs(),
            timeout.as_secs()
        );
        self.state.set_up(false);
        let report = self.stop_all().await?;
        Ok(Some(report))
    }

    /// 对账：成员非空且全部 running 视为在线，据此校正跟踪状态。
    /// 发现失败时返回错误，跟踪状态不变。
    pub async fn reconcile(&self) -> Result<Option<Transition>> {
        let _guard = self.lifecycle_lock.lock().await;
        let members = self.discovery.members().await?;
        let all_running = !members.is_empty() && members.iter().all(|c| c.state.is_running());

        let transition = match (all_running, self.state.is_up()) {
            (true, false) => {
                tracing::info!("Detected containers are now running");
                self.state.set_up(true);
                Some(Transition::WentUp)
            }
            (false, true) => {
                tracing::info!("Detected containers are no longer running");
                self.state.set_up(false);
                Some(Transition::WentDown)
            }
            _ => None,
        };
        Ok(transition)
    }

    /// 诊断：当前跟踪状态 + 实时成员视图
    pub async fn status(&self) -> Result<ProjectStatus> {
        let members = self.discovery.members().await?;
        let snapshot = self.state.snapshot();
        Ok(ProjectStatus {
            project: self.project().to_string(),
            up: snapshot.containers_up,
            idle_secs: tokio::time::Instant::now()
                .saturating_duration_since(snapshot.last_activity)
                .as_secs(),
            members: members
                .into_iter()
                .map(|c| MemberStatus {
                    id: c.id,
                    name: c.name,
                    state: c.state,
                })
                .collect(),
        })
    }
}
