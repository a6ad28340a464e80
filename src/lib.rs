//! Sleeper - Compose 项目容器的按需唤醒与闲置休眠
//!
//! 模块划分：
//! - **app**: 组装（身份解析、控制器与监控构建）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、活动状态、优雅关闭
//! - **engine**: 容器引擎抽象与实现（Docker / Mock）
//! - **lifecycle**: 成员发现、过滤策略、批量启停、活动监控
//! - **observability**: 日志初始化
//! - **admin**: 运维 HTTP 接口（feature = "admin"）

#[cfg(feature = "admin")]
pub mod admin;
pub mod app;
pub mod config;
pub mod core;
pub mod engine;
pub mod lifecycle;
pub mod observability;

pub use crate::core::{ActivityState, EngineError, Result, SleeperError};
pub use engine::{ContainerEngine, ContainerRef, DockerEngine, MockEngine, RunState};
pub use lifecycle::{ActivityMonitor, BatchReport, FilterMode, LifecycleController};
