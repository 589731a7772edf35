//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `RELAY__*` 覆盖（双下划线表示嵌套，
//! 如 `RELAY__RUN__POLL_INTERVAL_SECS=2`），最后兼容旧部署的扁平变量
//! （AZURE_TENANT_ID / AI_FOUNDRY_ENDPOINT / AI_AGENT_NAME / PORT 等）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub azure: AzureSection,
    pub foundry: FoundrySection,
    pub server: ServerSection,
    pub run: RunSection,
    pub tools: ToolsSection,
}

/// [azure] 段：Entra ID 服务凭据（client_credentials 流程）
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AzureSection {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// [foundry] 段：项目端点与语义智能体名
#[derive(Debug, Clone, Deserialize)]
pub struct FoundrySection {
    /// 项目端点 URL（AI_FOUNDRY_ENDPOINT）
    pub endpoint: Option<String>,
    /// 语义名称，运行时解析为 asst_ ID（AI_AGENT_NAME）
    pub agent_name: Option<String>,
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl Default for FoundrySection {
    fn default() -> Self {
        Self {
            endpoint: None,
            agent_name: None,
            api_version: default_api_version(),
        }
    }
}

fn default_api_version() -> String {
    "2024-12-01-preview".to_string()
}

/// [server] 段：监听端口
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self { port: default_port() }
    }
}

fn default_port() -> u16 {
    3001
}

/// [run] 段：轮询间隔与次数上限
#[derive(Debug, Clone, Deserialize)]
pub struct RunSection {
    /// 轮询间隔秒数，固定间隔无退避
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// 轮询次数上限，0 表示不封顶
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    1
}

fn default_max_attempts() -> u32 {
    60
}

impl RunSection {
    /// 0 映射为不封顶
    pub fn max_attempts_opt(&self) -> Option<u32> {
        if self.max_attempts == 0 {
            None
        } else {
            Some(self.max_attempts)
        }
    }
}

/// [tools] 段：事实卡工具端点与超时
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    /// 事实卡查询端点（FACT_CARD_URL），未配置时工具不注册
    pub fact_card_url: Option<String>,
    #[serde(default = "default_tool_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            fact_card_url: None,
            timeout_secs: default_tool_timeout_secs(),
        }
    }
}

fn default_tool_timeout_secs() -> u64 {
    15
}

/// 加载配置：TOML 文件 + RELAY__ 前缀环境变量 + 扁平兼容变量
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
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
        config::Environment::with_prefix("RELAY")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    let mut cfg: AppConfig = c.try_deserialize()?;
    apply_legacy_env(&mut cfg);
    Ok(cfg)
}

/// 扁平环境变量覆盖（与旧部署保持一致的变量名）
fn apply_legacy_env(cfg: &mut AppConfig) {
    if let Ok(v) = std::env::var("AZURE_TENANT_ID") {
        cfg.azure.tenant_id = Some(v);
    }
    if let Ok(v) = std::env::var("AZURE_CLIENT_ID") {
        cfg.azure.client_id = Some(v);
    }
    if let Ok(v) = std::env::var("AZURE_CLIENT_SECRET") {
        cfg.azure.client_secret = Some(v);
    }
    if let Ok(v) = std::env::var("AI_FOUNDRY_ENDPOINT") {
        cfg.foundry.endpoint = Some(v);
    }
    if let Ok(v) = std::env::var("AI_AGENT_NAME") {
        cfg.foundry.agent_name = Some(v);
    }
    if let Ok(v) = std::env::var("FACT_CARD_URL") {
        cfg.tools.fact_card_url = Some(v);
    }
    if let Ok(v) = std::env::var("PORT") {
        if let Ok(port) = v.parse() {
            cfg.server.port = port;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.server.port, 3001);
        assert_eq!(cfg.run.poll_interval_secs, 1);
        assert_eq!(cfg.run.max_attempts_opt(), Some(60));
        assert_eq!(cfg.foundry.api_version, "2024-12-01-preview");
        assert!(cfg.foundry.agent_name.is_none());
    }

    #[test]
    fn test_max_attempts_zero_is_uncapped() {
        let run = RunSection {
            poll_interval_secs: 1,
            max_attempts: 0,
        };
        assert_eq!(run.max_attempts_opt(), None);
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            r#"
[foundry]
endpoint = "https://example.services.ai.azure.com/api/projects/demo"
agent_name = "aescher2"

[run]
poll_interval_secs = 2
max_attempts = 10

[server]
port = 8080
"#
        )
        .unwrap();

        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.foundry.agent_name.as_deref(), Some("aescher2"));
        assert_eq!(cfg.foundry.api_version, "2024-12-01-preview");
        assert_eq!(cfg.run.poll_interval_secs, 2);
        assert_eq!(cfg.run.max_attempts_opt(), Some(10));
        assert_eq!(cfg.server.port, 8080);
    }
}
