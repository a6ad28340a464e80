//! 核心：错误类型、活动状态、优雅关闭

pub mod error;
pub mod shutdown;
pub mod state;

pub use error::{EngineError, Result, SleeperError};
pub use shutdown::{ShutdownManager, ShutdownReason};
pub use state::{ActivitySnapshot, ActivityState};
