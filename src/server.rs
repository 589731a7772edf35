//! HTTP 中继层：表现层消费的五个端点
//!
//! 所有厂商/网络错误在此边界统一转为 500 + {"error": ...}，安全拦截与
//! 截断不走错误路径（见 orchestrator）。/api/chat 按请求挂取消令牌：
//! 客户端断开时 DropGuard 触发取消，编排器在下个轮询间隙退出并尽力
//! 取消厂商侧运行。

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::error::RelayError;
use crate::foundry::{AgentInfo, AgentsApi};
use crate::orchestrator::{AgentTurnResult, TurnOrchestrator, TurnRequest, DEFAULT_SESSION_ID};
use crate::resolver::AgentResolver;
use crate::session::SessionRegistry;

/// 各处理器共享的组件
pub struct AppState {
    pub agent_name: String,
    pub api: Arc<dyn AgentsApi>,
    pub resolver: Arc<AgentResolver>,
    pub sessions: Arc<SessionRegistry>,
    pub orchestrator: Arc<TurnOrchestrator>,
}

/// 组装路由表
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(api_health))
        .route("/api/agent", get(api_agent))
        .route("/api/agents", get(api_agents))
        .route("/api/chat", post(api_chat))
        .route("/api/clear", post(api_clear))
        .with_state(state)
}

type ApiError = (StatusCode, Json<Value>);

fn internal_error(e: impl std::fmt::Display) -> ApiError {
    tracing::error!(error = %e, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": e.to_string() })))
}

/// 按配置名或字面 ID 查找智能体元数据
async fn find_agent(api: &dyn AgentsApi, name: &str) -> Result<AgentInfo, RelayError> {
    let agents = api.list_agents().await?;
    agents
        .into_iter()
        .find(|a| a.name.as_deref() == Some(name) || a.id == name)
        .ok_or_else(|| RelayError::AgentNotFound {
            name: name.to_string(),
            available: Vec::new(),
        })
}

/// GET /api/health：顺带刷新智能体身份；解析失败时降级回配置名
async fn api_health(State(state): State<Arc<AppState>>) -> Json<Value> {
    match find_agent(state.api.as_ref(), &state.agent_name).await {
        Ok(agent) => Json(json!({
            "status": "ok",
            "agentName": agent.name,
            "agentId": agent.id,
            "mode": "dynamic-resolution",
        })),
        Err(_) => {
            let fallback_id = state
                .resolver
                .cached_id()
                .await
                .unwrap_or_else(|| state.agent_name.clone());
            Json(json!({
                "status": "ok",
                "agentName": state.agent_name,
                "agentId": fallback_id,
                "mode": "dynamic-resolution",
            }))
        }
    }
}

/// GET /api/agent：配置智能体的完整元数据
async fn api_agent(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let agent = find_agent(state.api.as_ref(), &state.agent_name)
        .await
        .map_err(internal_error)?;
    Ok(Json(json!({
        "name": agent.name,
        "id": agent.id,
        "model": agent.model,
        "instructions": agent.instructions,
        "tools": agent.tool_labels(),
        "vectorStoreIds": agent.vector_store_ids(),
        "createdAt": agent.created_at_iso(),
    })))
}

#[derive(Debug, Serialize)]
struct AgentListItem {
    name: Option<String>,
    id: String,
    model: Option<String>,
    #[serde(rename = "createdAt")]
    created_at: Option<String>,
    tools: Vec<String>,
}

/// GET /api/agents：凭据可见的全部智能体
async fn api_agents(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let agents = state.api.list_agents().await.map_err(internal_error)?;
    let items: Vec<AgentListItem> = agents
        .into_iter()
        .map(|a| AgentListItem {
            name: a.name.clone(),
            id: a.id.clone(),
            model: a.model.clone(),
            created_at: a.created_at_iso(),
            tools: a.tool_labels(),
        })
        .collect();
    Ok(Json(json!({ "agents": items })))
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: Option<String>,
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
    #[serde(rename = "agentId")]
    agent_id: Option<String>,
}

/// POST /api/chat：跑完整回合
async fn api_chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<AgentTurnResult>, ApiError> {
    let message = req.message.unwrap_or_default();
    if message.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Message is required" })),
        ));
    }

    let turn = TurnRequest {
        message,
        session_id: req
            .session_id
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string()),
        agent_id: req.agent_id,
    };

    // 处理器 future 被丢弃（客户端断开）时 DropGuard 触发取消
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let orchestrator = Arc::clone(&state.orchestrator);
    let task = tokio::spawn(async move { orchestrator.run_turn(&turn, &cancel).await });

    let result = task
        .await
        .map_err(internal_error)?
        .map_err(internal_error)?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
struct ClearRequest {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// POST /api/clear：丢弃会话到线程的映射（远端线程不删）
async fn api_clear(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ClearRequest>,
) -> Json<Value> {
    let session_id = req
        .session_id
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string());
    state.sessions.clear(&session_id).await;
    Json(json!({ "status": "cleared" }))
}
