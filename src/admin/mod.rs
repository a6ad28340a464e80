//! 运维 HTTP 接口（feature = "admin"）
//!
//! - GET  /{prefix}/status  当前跟踪状态与成员
//! - POST /{prefix}/wake    单飞唤醒
//! - POST /{prefix}/sleep   立即休眠
//!
//! 引擎失败统一返回 503 + 错误信息。

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::core::SleeperError;
use crate::lifecycle::{BatchReport, LifecycleController};

#[derive(Debug, Serialize)]
struct WakeResponse {
    project: String,
    woke: bool,
    up: bool,
}

#[derive(Debug, Serialize)]
struct SleepResponse {
    project: String,
    report: BatchReport,
}

struct AdminError(SleeperError);

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        tracing::warn!("Admin request failed: {}", self.0);
        (StatusCode::SERVICE_UNAVAILABLE, self.0.to_string()).into_response()
    }
}

impl From<SleeperError> for AdminError {
    fn from(err: SleeperError) -> Self {
        Self(err)
    }
}

async fn api_status(
    State(controller): State<Arc<LifecycleController>>,
) -> Result<impl IntoResponse, AdminError> {
    Ok(Json(controller.status().await?))
}

async fn api_wake(
    State(controller): State<Arc<LifecycleController>>,
) -> Result<impl IntoResponse, AdminError> {
    let woke = controller.ensure_up().await?;
    controller.record_activity();
    Ok(Json(WakeResponse {
        project: controller.project().to_string(),
        woke,
        up: controller.is_up(),
    }))
}

async fn api_sleep(
    State(controller): State<Arc<LifecycleController>>,
) -> Result<impl IntoResponse, AdminError> {
    let report = controller.sleep_now().await?;
    Ok(Json(SleepResponse {
        project: controller.project().to_string(),
        report,
    }))
}

/// 构建路由；prefix 形如 "sleep-proxy"
pub fn router(controller: Arc<LifecycleController>, prefix: &str) -> Router {
    let prefix = prefix.trim_matches('/');
    Router::new()
        .route(&format!("/{}/status", prefix), get(api_status))
        .route(&format!("/{}/wake", prefix), post(api_wake))
        .route(&format!("/{}/sleep", prefix), post(api_sleep))
        .with_state(controller)
}

/// 监听 addr，直到 token 取消
pub async fn serve(
    controller: Arc<LifecycleController>,
    addr: SocketAddr,
    prefix: &str,
    token: CancellationToken,
) -> std::io::Result<()> {
    let app = router(controller, prefix);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Admin API listening on http://{}/{}", addr, prefix.trim_matches('/'));

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await
}
