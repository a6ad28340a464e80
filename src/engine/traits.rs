//! 容器引擎抽象
//!
//! 所有后端（Docker / Mock）实现 ContainerEngine：按标签列举、启动、停止、读取标签。

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::core::EngineError;

/// 容器运行状态；生命周期判断只关心是否 running
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Running,
    Stopped,
    Other(String),
}

impl RunState {
    /// 解析引擎返回的状态字符串（running / exited / created / paused ...）
    pub fn parse(raw: &str) -> Self {
        match raw {
            "running" => Self::Running,
            "exited" | "created" | "dead" => Self::Stopped,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Running => write!(f, "running"),
            RunState::Stopped => write!(f, "stopped"),
            RunState::Other(s) => write!(f, "{}", s),
        }
    }
}

impl Serialize for RunState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// 一次查询得到的容器视图，不做持久化
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRef {
    pub id: String,
    /// 显示名（已去掉前导 `/`）
    pub name: String,
    pub state: RunState,
    pub labels: HashMap<String, String>,
}

impl ContainerRef {
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

/// 标签过滤条件：`key=value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelFilter {
    pub key: String,
    pub value: String,
}

impl LabelFilter {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for LabelFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// 容器引擎 trait：列举（含已停止）、启动、带宽限期的停止、读取单个容器标签
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// 列出带有指定标签的全部容器（包括非 running 状态）
    async fn list_containers(&self, filter: &LabelFilter) -> Result<Vec<ContainerRef>, EngineError>;

    async fn start_container(&self, id: &str) -> Result<(), EngineError>;

    /// 停止容器；grace_secs 秒后引擎强制终止
    async fn stop_container(&self, id: &str, grace_secs: u64) -> Result<(), EngineError>;

    /// 读取单个容器的标签（启动时解析自身所属项目用）
    async fn container_labels(&self, id: &str) -> Result<HashMap<String, String>, EngineError>;
}
