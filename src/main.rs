//! Sleeper - Compose 项目容器的按需唤醒与闲置休眠
//!
//! 入口：初始化日志、加载配置、连接 Docker、启动活动监控，等待关闭信号。
//! 用法：`sleeper [config.toml]`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use sleeper::app::{build_controller, build_monitor, resolve_identity};
use sleeper::config::load_config;
use sleeper::core::{ShutdownManager, ShutdownReason};
use sleeper::engine::{ContainerEngine, DockerEngine};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 日志：默认 info，可通过 RUST_LOG 覆盖
    sleeper::observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = load_config(config_path).context("Failed to load config")?;
    config.validate().context("Invalid config")?;

    let engine: Arc<dyn ContainerEngine> = Arc::new(
        DockerEngine::connect(config.engine.docker_host.as_deref())
            .context("Failed to create docker client")?,
    );

    let identity = resolve_identity(&config, engine.as_ref())
        .await
        .context("Failed to resolve project")?;
    tracing::info!(
        "Managing project '{}' ({} mode, own container: {})",
        identity.project,
        config.project.filter_mode(),
        identity.own_id.as_deref().unwrap_or("none")
    );

    let controller = build_controller(&config, &identity, Arc::clone(&engine));

    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.install_signal_handlers();

    let mut monitor = build_monitor(&config, Arc::clone(&controller)).spawn(shutdown.token());

    #[cfg(feature = "admin")]
    let admin = if config.admin.enabled {
        let addr: std::net::SocketAddr = config
            .admin
            .bind
            .parse()
            .with_context(|| format!("Invalid admin bind address: {}", config.admin.bind))?;
        let controller = Arc::clone(&controller);
        let prefix = config.admin.endpoint_prefix.clone();
        let shutdown = Arc::clone(&shutdown);
        Some(tokio::spawn(async move {
            if let Err(e) = sleeper::admin::serve(controller, addr, &prefix, shutdown.token()).await {
                tracing::error!("Admin API error: {}", e);
                shutdown.shutdown(ShutdownReason::FatalError(format!("admin API: {}", e)));
            }
        }))
    } else {
        None
    };

    // 监控只应在 token 取消后退出；提前结束视为致命错误
    let monitor_done = tokio::select! {
        _ = shutdown.wait_for_shutdown() => false,
        res = &mut monitor => {
            let detail = match res {
                Ok(()) => "exited".to_string(),
                Err(e) => format!("failed: {}", e),
            };
            shutdown.shutdown(ShutdownReason::FatalError(format!("activity monitor {}", detail)));
            true
        }
    };
    if !monitor_done {
        monitor.await.context("Activity monitor task failed")?;
    }
    #[cfg(feature = "admin")]
    {
        if let Some(handle) = admin {
            let _ = handle.await;
        }
    }

    match shutdown.reason() {
        Some(ShutdownReason::FatalError(msg)) => anyhow::bail!("Sleeper stopped: {}", msg),
        _ => {
            tracing::info!("Sleeper stopped");
            Ok(())
        }
    }
}
