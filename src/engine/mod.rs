//! 容器引擎：抽象 trait 与实现（Docker / Mock）

pub mod docker;
pub mod mock;
pub mod traits;

pub use docker::DockerEngine;
pub use mock::MockEngine;
pub use traits::{ContainerEngine, ContainerRef, LabelFilter, RunState};
