//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `SLEEPER__*` 覆盖（双下划线表示嵌套，如 `SLEEPER__MONITOR__SLEEP_TIMEOUT_SECS=600`）。
//! 兼容旧部署的扁平变量：`SLEEP_TIMEOUT`、`ALLOW_LIST_MODE`、`DOCKER_HOST`、`ENDPOINT_PREFIX`、`PROXY_PORT`。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::core::{Result, SleeperError};
use crate::lifecycle::FilterMode;

pub const DEFAULT_PROJECT_LABEL: &str = "com.docker.compose.project";
pub const DEFAULT_ENABLE_LABEL: &str = "sleep-proxy.enable";

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub project: ProjectSection,
    pub monitor: MonitorSection,
    pub engine: EngineSection,
    pub admin: AdminSection,
}

/// [project] 段：项目身份与成员过滤
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProjectSection {
    /// 未设置时从自身容器的 compose 项目标签解析
    pub name: Option<String>,
    /// 自身容器 id，未设置时读 HOSTNAME
    pub container_id: Option<String>,
    pub project_label: String,
    pub enable_label: String,
    /// true：只管理标记 enable=true 的容器
    pub allow_list_mode: bool,
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            name: None,
            container_id: None,
            project_label: DEFAULT_PROJECT_LABEL.to_string(),
            enable_label: DEFAULT_ENABLE_LABEL.to_string(),
            allow_list_mode: false,
        }
    }
}

impl ProjectSection {
    pub fn filter_mode(&self) -> FilterMode {
        FilterMode::from_allow_list(self.allow_list_mode)
    }

    /// 自身容器 id：显式配置优先，其次 HOSTNAME（Docker 默认把短 id 设为主机名）
    pub fn own_id(&self) -> Option<String> {
        self.container_id
            .clone()
            .or_else(|| std::env::var("HOSTNAME").ok())
            .filter(|s| !s.trim().is_empty())
    }
}

/// [monitor] 段：闲置超时、对账周期、停止宽限期（秒）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorSection {
    pub sleep_timeout_secs: u64,
    pub check_interval_secs: u64,
    pub stop_grace_secs: u64,
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            sleep_timeout_secs: 86400,
            check_interval_secs: 10,
            stop_grace_secs: 10,
        }
    }
}

impl MonitorSection {
    pub fn sleep_timeout(&self) -> Duration {
        Duration::from_secs(self.sleep_timeout_secs)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }
}

/// [engine] 段：Docker 连接地址
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct EngineSection {
    /// unix:///var/run/docker.sock 或 tcp://host:2375；空则用本地默认
    pub docker_host: Option<String>,
}

/// [admin] 段：运维 HTTP 接口
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdminSection {
    pub enabled: bool,
    pub bind: String,
    pub endpoint_prefix: String,
}

impl Default for AdminSection {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: "0.0.0.0:8000".to_string(),
            endpoint_prefix: "sleep-proxy".to_string(),
        }
    }
}

impl AppConfig {
    /// 启动时校验；失败即致命
    pub fn validate(&self) -> Result<()> {
        if self.monitor.sleep_timeout_secs == 0 {
            return Err(SleeperError::Config(
                "monitor.sleep_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.monitor.check_interval_secs == 0 {
            return Err(SleeperError::Config(
                "monitor.check_interval_secs must be greater than 0".into(),
            ));
        }
        if self.project.project_label.trim().is_empty() {
            return Err(SleeperError::Config("project.project_label must not be empty".into()));
        }
        if self.project.enable_label.trim().is_empty() {
            return Err(SleeperError::Config("project.enable_label must not be empty".into()));
        }
        if matches!(self.project.name.as_deref(), Some(n) if n.trim().is_empty()) {
            return Err(SleeperError::Config("project.name must not be empty".into()));
        }
        if self.admin.endpoint_prefix.trim_matches('/').is_empty() {
            return Err(SleeperError::Config("admin.endpoint_prefix must not be empty".into()));
        }
        Ok(())
    }
}

fn legacy_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// 从 config 目录加载配置，环境变量 SLEEPER__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 叠加环境变量 SLEEPER__*（双下划线表示嵌套键）
/// 4. 旧版扁平变量最后覆盖
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("SLEEPER")
            .separator("__")
            .try_parsing(true),
    );

    builder = builder
        .set_override_option("monitor.sleep_timeout_secs", legacy_env("SLEEP_TIMEOUT"))?
        .set_override_option("project.allow_list_mode", legacy_env("ALLOW_LIST_MODE"))?
        .set_override_option("engine.docker_host", legacy_env("DOCKER_HOST"))?
        .set_override_option("admin.endpoint_prefix", legacy_env("ENDPOINT_PREFIX"))?
        .set_override_option(
            "admin.bind",
            legacy_env("PROXY_PORT").map(|port| format!("0.0.0.0:{}", port)),
        )?;

    let c = builder.build()?;
    Ok(c.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    // 环境变量是进程级的，读写环境的测试串行执行
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const LEGACY_VARS: [(&str, &str); 5] = [
        ("SLEEP_TIMEOUT", "120"),
        ("ALLOW_LIST_MODE", "true"),
        ("DOCKER_HOST", "tcp://docker:2375"),
        ("ENDPOINT_PREFIX", "naps"),
        ("PROXY_PORT", "9000"),
    ];
    const NESTED_VARS: [(&str, &str); 2] = [
        ("SLEEPER__PROJECT__NAME", "shop"),
        ("SLEEPER__MONITOR__CHECK_INTERVAL_SECS", "30"),
    ];

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.monitor.sleep_timeout(), Duration::from_secs(86400));
        assert_eq!(cfg.monitor.check_interval(), Duration::from_secs(10));
        assert_eq!(cfg.monitor.stop_grace_secs, 10);
        assert_eq!(cfg.project.filter_mode(), FilterMode::DenyList);
        assert_eq!(cfg.project.enable_label, DEFAULT_ENABLE_LABEL);
        assert_eq!(cfg.admin.endpoint_prefix, "sleep-proxy");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut cfg = AppConfig::default();
        cfg.monitor.check_interval_secs = 0;
        assert!(matches!(cfg.validate(), Err(SleeperError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_empty_label() {
        let mut cfg = AppConfig::default();
        cfg.project.enable_label = " ".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[project]
name = "shop"
allow_list_mode = true

[monitor]
sleep_timeout_secs = 600
"#
        )
        .unwrap();

        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.project.name.as_deref(), Some("shop"));
        assert_eq!(cfg.project.filter_mode(), FilterMode::AllowList);
        assert_eq!(cfg.monitor.sleep_timeout_secs, 600);
        assert_eq!(cfg.monitor.check_interval_secs, 10);
    }

    #[test]
    fn test_env_overrides_and_legacy_vars() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());
        for (k, v) in LEGACY_VARS.iter().chain(NESTED_VARS.iter()) {
            std::env::set_var(k, v);
        }

        let loaded = load_config(None);
        for (k, _) in LEGACY_VARS.iter().chain(NESTED_VARS.iter()) {
            std::env::remove_var(k);
        }
        let cfg = loaded.unwrap();

        assert_eq!(cfg.project.name.as_deref(), Some("shop"));
        assert_eq!(cfg.monitor.check_interval_secs, 30);
        assert_eq!(cfg.monitor.sleep_timeout(), Duration::from_secs(120));
        assert_eq!(cfg.project.filter_mode(), FilterMode::AllowList);
        assert_eq!(cfg.engine.docker_host.as_deref(), Some("tcp://docker:2375"));
        assert_eq!(cfg.admin.endpoint_prefix, "naps");
        assert_eq!(cfg.admin.bind, "0.0.0.0:9000");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_legacy_var_beats_nested_var() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());
        std::env::set_var("SLEEPER__MONITOR__SLEEP_TIMEOUT_SECS", "600");
        std::env::set_var("SLEEP_TIMEOUT", "45");
        std::env::set_var("ENDPOINT_PREFIX", "");

        let loaded = load_config(None);
        for k in ["SLEEPER__MONITOR__SLEEP_TIMEOUT_SECS", "SLEEP_TIMEOUT", "ENDPOINT_PREFIX"] {
            std::env::remove_var(k);
        }
        let cfg = loaded.unwrap();

        assert_eq!(cfg.monitor.sleep_timeout_secs, 45);
        // 空值视为未设置
        assert_eq!(cfg.admin.endpoint_prefix, "sleep-proxy");
    }

    #[test]
    fn test_explicit_container_id_wins() {
        let section = ProjectSection {
            container_id: Some("abc123abc123".into()),
            ..Default::default()
        };
        assert_eq!(section.own_id().as_deref(), Some("abc123abc123"));
    }
}
