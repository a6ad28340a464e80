//! Mock 引擎（用于测试，无需 Docker）
//!
//! 在内存里维护容器表，记录每次 start / stop 调用；可注入列举失败、单个容器启停失败，
//! 也可以在测试中直接改写状态来模拟「带外」启停。
//! 列举和停止可以设置延迟：列举先取快照再等待（返回的是过时结果），停止先等待再生效（模拟宽限期）。

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::core::EngineError;
use crate::engine::{ContainerEngine, ContainerRef, LabelFilter, RunState};

#[derive(Debug, Default)]
struct MockInner {
    containers: Vec<ContainerRef>,
    start_calls: Vec<String>,
    stop_calls: Vec<(String, u64)>,
    fail_list: bool,
    fail_start: HashSet<String>,
    fail_stop: HashSet<String>,
    /// 只作用于下一次列举
    next_list_delay: Option<Duration>,
    stop_delay: Duration,
}

/// Mock 客户端：启动 / 停止直接改写内存中的状态
#[derive(Debug, Default)]
pub struct MockEngine {
    inner: Mutex<MockInner>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockInner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// 添加一个容器；labels 形如 `[("com.docker.compose.project", "shop")]`
    pub fn add(&self, id: &str, name: &str, state: RunState, labels: &[(&str, &str)]) {
        let labels = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.lock().containers.push(ContainerRef {
            id: id.to_string(),
            name: name.to_string(),
            state,
            labels,
        });
    }

    /// 带外修改状态（模拟有人手动 docker start / 容器崩溃）
    pub fn set_state(&self, id: &str, state: RunState) {
        if let Some(c) = self.lock().containers.iter_mut().find(|c| c.id == id) {
            c.state = state;
        }
    }

    /// 带外修改所有容器状态
    pub fn set_all(&self, state: RunState) {
        for c in self.lock().containers.iter_mut() {
            c.state = state.clone();
        }
    }

    pub fn state_of(&self, id: &str) -> Option<RunState> {
        self.lock()
            .containers
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.state.clone())
    }

    pub fn fail_list(&self, fail: bool) {
        self.lock().fail_list = fail;
    }

    pub fn fail_start(&self, id: &str) {
        self.lock().fail_start.insert(id.to_string());
    }

    pub fn fail_stop(&self, id: &str) {
        self.lock().fail_stop.insert(id.to_string());
    }

    /// 下一次 list_containers 取完快照后再等待 delay 才返回
    pub fn delay_next_list(&self, delay: Duration) {
        self.lock().next_list_delay = Some(delay);
    }

    /// 每次 stop_container 等待 delay 后才把容器置为 stopped
    pub fn set_stop_delay(&self, delay: Duration) {
        self.lock().stop_delay = delay;
    }

    pub fn start_calls(&self) -> Vec<String> {
        self.lock().start_calls.clone()
    }

    pub fn stop_calls(&self) -> Vec<(String, u64)> {
        self.lock().stop_calls.clone()
    }

    pub fn reset_calls(&self) {
        let mut inner = self.lock();
        inner.start_calls.clear();
        inner.stop_calls.clear();
    }
}

#[async_trait]
impl ContainerEngine for MockEngine {
    async fn list_containers(&self, filter: &LabelFilter) -> Result<Vec<ContainerRef>, EngineError> {
        let (snapshot, delay) = {
            let mut inner = self.lock();
            if inner.fail_list {
                return Err(EngineError::Unavailable("mock list failure".to_string()));
            }
            let snapshot: Vec<ContainerRef> = inner
                .containers
                .iter()
                .filter(|c| c.label(&filter.key) == Some(filter.value.as_str()))
                .cloned()
                .collect();
            (snapshot, inner.next_list_delay.take())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(snapshot)
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        let mut inner = self.lock();
        inner.start_calls.push(id.to_string());
        if inner.fail_start.contains(id) {
            return Err(EngineError::operation("start", id, "mock start failure"));
        }
        match inner.containers.iter_mut().find(|c| c.id == id) {
            Some(c) => {
                c.state = RunState::Running;
                Ok(())
            }
            None => Err(EngineError::operation("start", id, "no such container")),
        }
    }

    async fn stop_container(&self, id: &str, grace_secs: u64) -> Result<(), EngineError> {
        let delay = {
            let mut inner = self.lock();
            inner.stop_calls.push((id.to_string(), grace_secs));
            if inner.fail_stop.contains(id) {
                return Err(EngineError::operation("stop", id, "mock stop failure"));
            }
            inner.stop_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match self.lock().containers.iter_mut().find(|c| c.id == id) {
            Some(c) => {
                c.state = RunState::Stopped;
                Ok(())
            }
            None => Err(EngineError::operation("stop", id, "no such container")),
        }
    }

    async fn container_labels(&self, id: &str) -> Result<HashMap<String, String>, EngineError> {
        self.lock()
            .containers
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.labels.clone())
            .ok_or_else(|| EngineError::operation("inspect", id, "no such container"))
    }
}
