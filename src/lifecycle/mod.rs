//! 生命周期：成员发现、过滤策略、批量启停、活动监控

pub mod controller;
pub mod discovery;
pub mod monitor;
pub mod policy;

pub use controller::{
    BatchFailure, BatchReport, LifecycleController, MemberStatus, ProjectStatus, Transition,
    DEFAULT_STOP_GRACE_SECS,
};
pub use discovery::{Discovery, DiscoveryConfig};
pub use monitor::{ActivityMonitor, CycleOutcome, DEFAULT_CHECK_INTERVAL};
pub use policy::{is_self, FilterMode};
