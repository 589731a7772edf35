//! Foundry Relay 服务入口
//!
//! 初始化日志与配置，组装凭据 / 客户端 / 注册表 / 编排器，启动 axum。

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use foundry_relay::auth::ClientSecretProvider;
use foundry_relay::config::load_config;
use foundry_relay::foundry::FoundryClient;
use foundry_relay::orchestrator::{PollSettings, TurnOrchestrator};
use foundry_relay::resolver::AgentResolver;
use foundry_relay::server::{router, AppState};
use foundry_relay::session::SessionRegistry;
use foundry_relay::tools::{FactCardTool, ToolRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 日志：默认 info，可通过 RUST_LOG 覆盖
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with(fmt::layer())
        .init();

    let cfg = load_config(None).context("Failed to load config")?;

    let endpoint = cfg
        .foundry
        .endpoint
        .clone()
        .context("AI_FOUNDRY_ENDPOINT is not set")?;
    let agent_name = cfg
        .foundry
        .agent_name
        .clone()
        .context("AI_AGENT_NAME is not set")?;
    let tenant_id = cfg.azure.tenant_id.clone().context("AZURE_TENANT_ID is not set")?;
    let client_id = cfg.azure.client_id.clone().context("AZURE_CLIENT_ID is not set")?;
    let client_secret = cfg
        .azure
        .client_secret
        .clone()
        .context("AZURE_CLIENT_SECRET is not set")?;

    let token = Arc::new(ClientSecretProvider::new(&tenant_id, &client_id, &client_secret));
    let api = Arc::new(FoundryClient::new(&endpoint, &cfg.foundry.api_version, token));

    let resolver = Arc::new(AgentResolver::new(api.clone()));
    let sessions = Arc::new(SessionRegistry::new(api.clone()));

    let mut tools = ToolRegistry::new();
    if let Some(url) = &cfg.tools.fact_card_url {
        tools.register(FactCardTool::new(url, cfg.tools.timeout_secs));
    } else {
        tracing::warn!("FACT_CARD_URL not set, fact card tool disabled");
    }

    let settings = PollSettings {
        interval: Duration::from_secs(cfg.run.poll_interval_secs),
        max_attempts: cfg.run.max_attempts_opt(),
    };
    let orchestrator = Arc::new(TurnOrchestrator::new(
        api.clone(),
        resolver.clone(),
        sessions.clone(),
        Arc::new(tools),
        &agent_name,
        settings,
    ));

    let state = Arc::new(AppState {
        agent_name: agent_name.clone(),
        api,
        resolver,
        sessions,
        orchestrator,
    });

    let addr = format!("0.0.0.0:{}", cfg.server.port);
    tracing::info!(%endpoint, agent = %agent_name, %addr, "foundry relay ready");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
