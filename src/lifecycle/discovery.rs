//! 成员发现：按项目标签列举容器，排除自身，再套用白名单 / 黑名单
//!
//! 只读查询，无副作用；引擎失败时返回 Discovery 错误，调用方本轮跳过、不改状态。

use std::sync::Arc;

use crate::core::{Result, SleeperError};
use crate::engine::{ContainerEngine, ContainerRef, LabelFilter};
use crate::lifecycle::policy::{is_self, FilterMode};

/// 发现所需的静态参数
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub project: String,
    /// 本进程所在容器的 id；不在容器内运行时为 None
    pub own_id: Option<String>,
    pub project_label: String,
    pub enable_label: String,
    pub mode: FilterMode,
}

impl DiscoveryConfig {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            own_id: None,
            project_label: crate::config::DEFAULT_PROJECT_LABEL.to_string(),
            enable_label: crate::config::DEFAULT_ENABLE_LABEL.to_string(),
            mode: FilterMode::default(),
        }
    }

    pub fn with_own_id(mut self, own_id: impl Into<String>) -> Self {
        self.own_id = Some(own_id.into());
        self
    }

    pub fn with_mode(mut self, mode: FilterMode) -> Self {
        self.mode = mode;
        self
    }
}

pub struct Discovery {
    engine: Arc<dyn ContainerEngine>,
    config: DiscoveryConfig,
}

impl Discovery {
    pub fn new(engine: Arc<dyn ContainerEngine>, config: DiscoveryConfig) -> Self {
        Self { engine, config }
    }

    pub fn project(&self) -> &str {
        &self.config.project
    }

    pub fn mode(&self) -> FilterMode {
        self.config.mode
    }

    /// 当前受控成员及其实际状态
    pub async fn members(&self) -> Result<Vec<ContainerRef>> {
        let filter = LabelFilter::new(&self.config.project_label, &self.config.project);
        let candidates = self
            .engine
            .list_containers(&filter)
            .await
            .map_err(SleeperError::Discovery)?;

        Ok(candidates
            .into_iter()
            .filter(|c| self.admits(c))
            .collect())
    }

    fn admits(&self, c: &ContainerRef) -> bool {
        if let Some(own) = self.config.own_id.as_deref() {
            if is_self(&c.id, own) {
                tracing::debug!("Skipping own container {}", c.name);
                return false;
            }
        }

        let label = c.label(&self.config.enable_label);
        let admitted = self.config.mode.admits(label);
        if admitted {
            tracing::debug!(
                "Including container {} ({} mode, {}={})",
                c.name,
                self.config.mode,
                self.config.enable_label,
                label.unwrap_or("")
            );
        } else {
            tracing::info!(
                "Excluding container {} ({} mode, {}={})",
                c.name,
                self.config.mode,
                self.config.enable_label,
                label.unwrap_or("")
            );
        }
        admitted
    }
}
