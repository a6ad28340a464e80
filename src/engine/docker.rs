//! Docker 后端：通过 bollard 访问 Docker Engine API
//!
//! 连接方式：未配置 host 时使用本地默认（DOCKER_HOST 或 /var/run/docker.sock）；
//! `unix://` 走套接字，`tcp://` / `http://` 走 HTTP。

use std::collections::HashMap;

use async_trait::async_trait;
use bollard::container::{
    InspectContainerOptions, ListContainersOptions, StartContainerOptions, StopContainerOptions,
};
use bollard::models::ContainerSummary;
use bollard::{Docker, API_DEFAULT_VERSION};

use crate::core::EngineError;
use crate::engine::{ContainerEngine, ContainerRef, LabelFilter, RunState};

/// 连接超时（秒）
const CONNECT_TIMEOUT_SECS: u64 = 120;

pub struct DockerEngine {
    client: Docker,
}

impl DockerEngine {
    /// 按配置的 host 建立客户端（不发请求，首次调用时才真正连接）
    pub fn connect(host: Option<&str>) -> Result<Self, EngineError> {
        let client = match host {
            None | Some("") => Docker::connect_with_local_defaults()?,
            Some(h) if h.starts_with("unix://") => {
                Docker::connect_with_unix(h, CONNECT_TIMEOUT_SECS, API_DEFAULT_VERSION)?
            }
            Some(h) if h.starts_with("tcp://") || h.starts_with("http://") => {
                Docker::connect_with_http(h, CONNECT_TIMEOUT_SECS, API_DEFAULT_VERSION)?
            }
            Some(h) => {
                return Err(EngineError::Unavailable(format!(
                    "Unsupported docker host scheme: {}",
                    h
                )))
            }
        };
        Ok(Self { client })
    }

    pub fn from_client(client: Docker) -> Self {
        Self { client }
    }
}

/// 把 API 返回的摘要转换为 ContainerRef；没有 id 的条目丢弃
fn to_container_ref(summary: ContainerSummary) -> Option<ContainerRef> {
    let id = summary.id?;
    let name = summary
        .names
        .and_then(|names| names.into_iter().next())
        .map(|n| n.trim_start_matches('/').to_string())
        .unwrap_or_else(|| id.chars().take(12).collect());
    let state = RunState::parse(summary.state.as_deref().unwrap_or(""));

    Some(ContainerRef {
        id,
        name,
        state,
        labels: summary.labels.unwrap_or_default(),
    })
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn list_containers(&self, filter: &LabelFilter) -> Result<Vec<ContainerRef>, EngineError> {
        let mut filters = HashMap::new();
        filters.insert("label".to_string(), vec![filter.to_string()]);

        let options = ListContainersOptions {
            all: true,
            filters,
            ..Default::default()
        };

        let summaries = self.client.list_containers(Some(options)).await?;
        Ok(summaries.into_iter().filter_map(to_container_ref).collect())
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        self.client
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| EngineError::operation("start", id, e))
    }

    async fn stop_container(&self, id: &str, grace_secs: u64) -> Result<(), EngineError> {
        let options = StopContainerOptions {
            t: i64::try_from(grace_secs).unwrap_or(i64::MAX),
        };
        self.client
            .stop_container(id, Some(options))
            .await
            .map_err(|e| EngineError::operation("stop", id, e))
    }

    async fn container_labels(&self, id: &str) -> Result<HashMap<String, String>, EngineError> {
        let info = self
            .client
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .map_err(|e| EngineError::operation("inspect", id, e))?;

        Ok(info
            .config
            .and_then(|c| c.labels)
            .unwrap_or_default())
    }
}
