//! 活动状态：容器是否在线 + 最近一次请求时间
//!
//! 两个字段放在同一把锁内，读写都是原子的，任何读者都看不到「更新了一半」的状态。
//! record_activity 每个转发请求都会调用，只做一次内存写，不触发任何 I/O。

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Inner {
    containers_up: bool,
    last_activity: Instant,
}

/// 一次性读取的状态快照
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivitySnapshot {
    pub containers_up: bool,
    pub last_activity: Instant,
}

/// 受锁保护的活动状态；初始为 down，last_activity = 创建时刻
#[derive(Debug)]
pub struct ActivityState {
    inner: Mutex<Inner>,
}

impl ActivityState {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                containers_up: false,
                last_activity: Instant::now(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // 锁内只有纯赋值，不存在半途 panic 留下的不一致数据
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_up(&self) -> bool {
        self.lock().containers_up
    }

    pub fn set_up(&self, up: bool) {
        self.lock().containers_up = up;
    }

    /// 记录一次活动（now）
    pub fn record_activity(&self) {
        self.record_activity_at(Instant::now());
    }

    /// 记录指定时刻的活动；只前进不后退，结果恒为所有记录中的最大值
    pub fn record_activity_at(&self, at: Instant) {
        let mut inner = self.lock();
        if at > inner.last_activity {
            inner.last_activity = at;
        }
    }

    pub fn last_activity(&self) -> Instant {
        self.lock().last_activity
    }

    /// 距离最近一次活动已过去多久
    pub fn idle_for(&self) -> Duration {
        Instant::now().saturating_duration_since(self.last_activity())
    }

    pub fn snapshot(&self) -> ActivitySnapshot {
        let inner = *self.lock();
        ActivitySnapshot {
            containers_up: inner.containers_up,
            last_activity: inner.last_activity,
        }
    }
}

impl Default for ActivityState {
    fn default() -> Self {
        Self::new()
    }
}
