//! 组装：解析身份、构建控制器与活动监控
//!
//! 供 main 与集成测试共用；引擎由调用方传入（Docker 或 Mock）。

use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::{ActivityState, Result, SleeperError};
use crate::engine::ContainerEngine;
use crate::lifecycle::{ActivityMonitor, DiscoveryConfig, LifecycleController};

/// 进程身份：所属项目 + 自身容器 id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub project: String,
    pub own_id: Option<String>,
}

/// 确定项目名：显式配置优先，否则读取自身容器的项目标签
pub async fn resolve_identity(
    config: &AppConfig,
    engine: &dyn ContainerEngine,
) -> Result<Identity> {
    let own_id = config.project.own_id();

    if let Some(name) = config.project.name.clone() {
        return Ok(Identity {
            project: name,
            own_id,
        });
    }

    let id = own_id.clone().ok_or_else(|| {
        SleeperError::ProjectUnresolved(
            "project.name is not set and own container id is unknown".into(),
        )
    })?;
    let labels = engine.container_labels(&id).await?;
    let project = labels
        .get(&config.project.project_label)
        .filter(|v| !v.is_empty())
        .cloned()
        .ok_or_else(|| {
            SleeperError::ProjectUnresolved(format!(
                "container {} has no '{}' label",
                id, config.project.project_label
            ))
        })?;

    tracing::info!("Resolved project '{}' from container {}", project, id);
    Ok(Identity { project, own_id })
}

/// 按配置构建控制器
pub fn build_controller(
    config: &AppConfig,
    identity: &Identity,
    engine: Arc<dyn ContainerEngine>,
) -> Arc<LifecycleController> {
    let mut discovery = DiscoveryConfig::new(identity.project.clone())
        .with_mode(config.project.filter_mode());
    discovery.project_label = config.project.project_label.clone();
    discovery.enable_label = config.project.enable_label.clone();
    discovery.own_id = identity.own_id.clone();

    Arc::new(
        LifecycleController::new(engine, discovery, Arc::new(ActivityState::new()))
            .with_stop_grace(config.monitor.stop_grace_secs),
    )
}

/// 按配置构建活动监控
pub fn build_monitor(config: &AppConfig, controller: Arc<LifecycleController>) -> ActivityMonitor {
    ActivityMonitor::new(controller, config.monitor.sleep_timeout())
        .with_check_interval(config.monitor.check_interval())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{MockEngine, RunState};

    #[tokio::test]
    async fn test_explicit_project_name() {
        let engine = MockEngine::new();
        let mut config = AppConfig::default();
        config.project.name = Some("shop".into());
        config.project.container_id = Some("self00000000".into());

        let identity = resolve_identity(&config, &engine).await.unwrap();
        assert_eq!(identity.project, "shop");
        assert_eq!(identity.own_id.as_deref(), Some("self00000000"));
    }

    #[tokio::test]
    async fn test_project_from_own_label() {
        let engine = MockEngine::new();
        engine.add(
            "self00000000",
            "shop-sleeper",
            RunState::Running,
            &[("com.docker.compose.project", "shop")],
        );
        let mut config = AppConfig::default();
        config.project.container_id = Some("self00000000".into());

        let identity = resolve_identity(&config, &engine).await.unwrap();
        assert_eq!(identity.project, "shop");
    }

    #[tokio::test]
    async fn test_missing_label_is_unresolved() {
        let engine = MockEngine::new();
        engine.add("self00000000", "lonely", RunState::Running, &[]);
        let mut config = AppConfig::default();
        config.project.container_id = Some("self00000000".into());

        let err = resolve_identity(&config, &engine).await.unwrap_err();
        assert!(matches!(err, SleeperError::ProjectUnresolved(_)));
    }

    #[tokio::test]
    async fn test_build_controller_applies_config() {
        let engine = Arc::new(MockEngine::new());
        engine.add(
            "web",
            "shop-web",
            RunState::Running,
            &[("custom.project", "shop"), ("custom.enable", "true")],
        );
        engine.add("db", "shop-db", RunState::Running, &[("custom.project", "shop")]);

        let mut config = AppConfig::default();
        config.project.project_label = "custom.project".into();
        config.project.enable_label = "custom.enable".into();
        config.project.allow_list_mode = true;
        config.monitor.stop_grace_secs = 4;
        let identity = Identity {
            project: "shop".into(),
            own_id: None,
        };

        let controller = build_controller(&config, &identity, engine.clone());
        controller.stop_all().await.unwrap();
        assert_eq!(engine.stop_calls(), vec![("web".to_string(), 4)]);
    }
}
