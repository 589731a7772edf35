//! 中继端到端测试：经 axum 路由走完整回合（Mock 厂商 API，无网络）

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use foundry_relay::foundry::{
    mock_run, AgentInfo, MessageRole, MockAgentsApi, RunStatus, ThreadMessage,
};
use foundry_relay::orchestrator::{PollSettings, TurnOrchestrator};
use foundry_relay::resolver::AgentResolver;
use foundry_relay::server::{router, AppState};
use foundry_relay::session::SessionRegistry;
use foundry_relay::tools::ToolRegistry;

fn build_router(api: Arc<MockAgentsApi>) -> axum::Router {
    let resolver = Arc::new(AgentResolver::new(api.clone()));
    let sessions = Arc::new(SessionRegistry::new(api.clone()));
    let settings = PollSettings {
        interval: Duration::from_millis(1),
        max_attempts: Some(60),
    };
    let orchestrator = Arc::new(TurnOrchestrator::new(
        api.clone(),
        resolver.clone(),
        sessions.clone(),
        Arc::new(ToolRegistry::new()),
        "aescher2",
        settings,
    ));
    router(Arc::new(AppState {
        agent_name: "aescher2".to_string(),
        api,
        resolver,
        sessions,
        orchestrator,
    }))
}

fn test_agent() -> AgentInfo {
    AgentInfo {
        id: "asst_abc".to_string(),
        name: Some("aescher2".to_string()),
        model: Some("gpt-4o".to_string()),
        instructions: Some("Answer with facts".to_string()),
        tools: vec![json!({"type": "function", "function": {"name": "getFactCard"}})],
        tool_resources: Some(json!({"file_search": {"vector_store_ids": ["vs_1"]}})),
        created_at: Some(1700000000),
    }
}

fn assistant_message(id: &str, text: &str) -> ThreadMessage {
    ThreadMessage {
        id: id.to_string(),
        role: MessageRole::Assistant,
        content: json!([{"type": "text", "text": {"value": text, "annotations": []}}]),
    }
}

fn script_completed_turn(api: &MockAgentsApi, msg: &str) {
    api.push_run(mock_run("run_1", RunStatus::Queued));
    api.push_run(mock_run("run_1", RunStatus::Completed));
    api.set_messages(vec![assistant_message("msg_1", msg)]);
}

async fn post_json(app: &axum::Router, path: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::post(path)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn get_json(app: &axum::Router, path: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn chat_turn_returns_content_and_thread() {
    let api = Arc::new(MockAgentsApi::new());
    api.set_agents(vec![test_agent()]);
    script_completed_turn(&api, "Hi there");
    let app = build_router(api.clone());

    let (status, body) = post_json(
        &app,
        "/api/chat",
        json!({"message": "Hello", "sessionId": "s1"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "Hi there");
    assert_eq!(body["sources"], json!([]));
    assert_eq!(body["threadId"], "thread_1");
    assert_eq!(body["meta"]["toolUsed"], json!(false));
    assert_eq!(body["meta"]["safety"]["status"], "passed");
}

#[tokio::test]
async fn chat_without_message_is_bad_request() {
    let api = Arc::new(MockAgentsApi::new());
    let app = build_router(api);

    let (status, body) = post_json(&app, "/api/chat", json!({"sessionId": "s1"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Message is required");

    let app2 = build_router(Arc::new(MockAgentsApi::new()));
    let (status, _) = post_json(&app2, "/api/chat", json!({"message": "   "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn same_session_reuses_thread_until_cleared() {
    let api = Arc::new(MockAgentsApi::new());
    api.set_agents(vec![test_agent()]);
    let app = build_router(api.clone());

    script_completed_turn(&api, "first");
    let (_, body1) = post_json(
        &app,
        "/api/chat",
        json!({"message": "one", "sessionId": "s1"}),
    )
    .await;

    script_completed_turn(&api, "second");
    let (_, body2) = post_json(
        &app,
        "/api/chat",
        json!({"message": "two", "sessionId": "s1"}),
    )
    .await;
    assert_eq!(body1["threadId"], body2["threadId"]);

    let (status, cleared) = post_json(&app, "/api/clear", json!({"sessionId": "s1"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleared["status"], "cleared");
    // 重复 clear 幂等
    let (status, _) = post_json(&app, "/api/clear", json!({"sessionId": "s1"})).await;
    assert_eq!(status, StatusCode::OK);

    script_completed_turn(&api, "third");
    let (_, body3) = post_json(
        &app,
        "/api/chat",
        json!({"message": "three", "sessionId": "s1"}),
    )
    .await;
    assert_ne!(body1["threadId"], body3["threadId"]);
}

#[tokio::test]
async fn run_failure_surfaces_as_500_error_payload() {
    let api = Arc::new(MockAgentsApi::new());
    api.set_agents(vec![test_agent()]);
    let mut failed = mock_run("run_1", RunStatus::Failed);
    failed.last_error = Some(foundry_relay::foundry::LastError {
        code: Some("server_error".to_string()),
        message: Some("model exploded".to_string()),
    });
    api.push_run(failed);
    let app = build_router(api);

    let (status, body) = post_json(&app, "/api/chat", json!({"message": "hi"})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("model exploded"));
}

#[tokio::test]
async fn health_reports_resolved_identity() {
    let api = Arc::new(MockAgentsApi::new());
    api.set_agents(vec![test_agent()]);
    let app = build_router(api);

    let (status, body) = get_json(&app, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["agentName"], "aescher2");
    assert_eq!(body["agentId"], "asst_abc");
    assert_eq!(body["mode"], "dynamic-resolution");
}

#[tokio::test]
async fn health_degrades_to_configured_name() {
    // 项目里没有任何智能体时仍然报 ok
    let api = Arc::new(MockAgentsApi::new());
    let app = build_router(api);

    let (status, body) = get_json(&app, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["agentName"], "aescher2");
    assert_eq!(body["agentId"], "aescher2");
}

#[tokio::test]
async fn agent_metadata_endpoint() {
    let api = Arc::new(MockAgentsApi::new());
    api.set_agents(vec![test_agent()]);
    let app = build_router(api);

    let (status, body) = get_json(&app, "/api/agent").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "aescher2");
    assert_eq!(body["id"], "asst_abc");
    assert_eq!(body["model"], "gpt-4o");
    assert_eq!(body["tools"], json!(["fn:getFactCard"]));
    assert_eq!(body["vectorStoreIds"], json!(["vs_1"]));
}

#[tokio::test]
async fn agents_listing_endpoint() {
    let api = Arc::new(MockAgentsApi::new());
    api.set_agents(vec![test_agent()]);
    let app = build_router(api);

    let (status, body) = get_json(&app, "/api/agents").await;
    assert_eq!(status, StatusCode::OK);
    let agents = body["agents"].as_array().unwrap();
    assert_eq!(agents.len(), 1);
    assert_eq!(agents[0]["id"], "asst_abc");
    assert_eq!(agents[0]["tools"], json!(["fn:getFactCard"]));
}
