//! 错误类型
//!
//! EngineError 描述与容器引擎交互失败；SleeperError 是对外暴露的顶层错误。
//! 引擎错误都视为瞬时错误：调用方记录日志后在下一轮或下一次请求时重试，不改变已跟踪状态。

use thiserror::Error;

/// 容器引擎调用失败（连接、列举、启动、停止、查看）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Container engine unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to {op} container {id}: {reason}")]
    Operation {
        op: &'static str,
        id: String,
        reason: String,
    },
}

impl EngineError {
    pub fn operation(op: &'static str, id: impl Into<String>, reason: impl ToString) -> Self {
        Self::Operation {
            op,
            id: id.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<bollard::errors::Error> for EngineError {
    fn from(err: bollard::errors::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// 生命周期控制器对外的错误
#[derive(Error, Debug)]
pub enum SleeperError {
    /// 成员发现失败：本轮跳过，状态保持不变
    #[error("Failed to list containers: {0}")]
    Discovery(#[source] EngineError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Config error: {0}")]
    Config(String),

    /// 未配置项目名，且自身容器上也没有 compose 项目标签
    #[error("Cannot resolve project name: {0}")]
    ProjectUnresolved(String),
}

impl From<config::ConfigError> for SleeperError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SleeperError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_error_message() {
        let err = EngineError::operation("stop", "abc123", "timeout");
        assert_eq!(err.to_string(), "Failed to stop container abc123: timeout");
    }

    #[test]
    fn test_discovery_wraps_engine_error() {
        let err = SleeperError::Discovery(EngineError::Unavailable("socket closed".into()));
        assert!(err.to_string().contains("socket closed"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
