//! 回合编排器：驱动一次完整的智能体回合
//!
//! 状态机：解析智能体 → 确保线程 → 追加消息 → 发起运行 → 固定间隔轮询 →
//! requires_action 时批量执行并提交工具输出 → 终态处理 → 提取内容与元数据。
//! 轮询睡眠是唯一挂起点，取消令牌只在此处生效。安全拦截不是错误：返回
//! 带 safety 标记的正常结果。任何失败都会使解析器缓存失效后原样上抛。

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::RelayError;
use crate::extract::extract_content;
use crate::foundry::{AgentsApi, MessageRole, Run, RunStatus, ToolCall, ToolOutput};
use crate::resolver::AgentResolver;
use crate::session::SessionRegistry;
use crate::tools::ToolRegistry;

/// 未指定会话 ID 时的默认值
pub const DEFAULT_SESSION_ID: &str = "default";

/// 安全拦截时返回给用户的固定文案
const BLOCKED_CONTENT: &str = "The response was blocked by safety filters.";

/// 轮询参数：固定间隔，无抖动无退避；max_attempts 为 None 时不封顶
#[derive(Debug, Clone)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: Option<u32>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: Some(60),
        }
    }
}

/// 一次回合的输入
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub message: String,
    pub session_id: String,
    /// 显式指定时跳过名称解析（不写入缓存槽）
    pub agent_id: Option<String>,
}

impl TurnRequest {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            session_id: DEFAULT_SESSION_ID.to_string(),
            agent_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TokenCounts {
    pub prompt: u64,
    pub completion: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SafetyMeta {
    /// passed / blocked / truncated
    pub status: String,
    pub violation: Option<String>,
}

/// 回合元数据（HTTP 边界序列化为 camelCase）
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnMeta {
    pub duration_ms: u64,
    pub tokens: Option<TokenCounts>,
    pub tool_used: bool,
    pub tool_names: Vec<String>,
    pub model: Option<String>,
    pub safety: SafetyMeta,
    pub citations: Vec<String>,
}

/// 编排器输出：一次回合的最终结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentTurnResult {
    pub id: String,
    pub content: String,
    pub sources: Vec<String>,
    pub thread_id: String,
    pub meta: TurnMeta,
}

/// 回合编排器。一个线程同时只有一个在途运行（回合内严格串行）
pub struct TurnOrchestrator {
    api: Arc<dyn AgentsApi>,
    resolver: Arc<AgentResolver>,
    sessions: Arc<SessionRegistry>,
    tools: Arc<ToolRegistry>,
    agent_name: String,
    settings: PollSettings,
}

impl TurnOrchestrator {
    pub fn new(
        api: Arc<dyn AgentsApi>,
        resolver: Arc<AgentResolver>,
        sessions: Arc<SessionRegistry>,
        tools: Arc<ToolRegistry>,
        agent_name: &str,
        settings: PollSettings,
    ) -> Self {
        Self {
            api,
            resolver,
            sessions,
            tools,
            agent_name: agent_name.to_string(),
            settings,
        }
    }

    /// 驱动一次回合；失败时使解析器缓存失效后原样上抛
    pub async fn run_turn(
        &self,
        req: &TurnRequest,
        cancel: &CancellationToken,
    ) -> Result<AgentTurnResult, RelayError> {
        match self.drive_turn(req, cancel).await {
            Ok(result) => Ok(result),
            Err(e) => {
                self.resolver.invalidate().await;
                Err(e)
            }
        }
    }

    async fn drive_turn(
        &self,
        req: &TurnRequest,
        cancel: &CancellationToken,
    ) -> Result<AgentTurnResult, RelayError> {
        // 1. 解析智能体（显式 ID 优先）
        let agent_id = match &req.agent_id {
            Some(id) => id.clone(),
            None => self.resolver.resolve(&self.agent_name).await?,
        };

        // 2. 确保线程
        let thread_id = self.sessions.get_or_create(&req.session_id).await?;

        // 3. 追加用户消息
        self.api
            .create_message(&thread_id, "user", &req.message)
            .await
            .map_err(|e| RelayError::MessageSubmission(e.to_string()))?;

        // 4. 发起运行
        let started = Instant::now();
        let mut run = self
            .api
            .create_run(&thread_id, &agent_id)
            .await
            .map_err(|e| RelayError::RunCreation(e.to_string()))?;
        tracing::info!(run_id = %run.id, status = ?run.status, "run created");

        // 5. 轮询循环
        let mut attempts: u32 = 0;
        while run.status.is_active() {
            attempts += 1;
            if let Some(max) = self.settings.max_attempts {
                if attempts > max {
                    // 客户端放弃后厂商侧运行仍会继续，尽力取消
                    let _ = self.api.cancel_run(&thread_id, &run.id).await;
                    return Err(RelayError::RunTimeout);
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = self.api.cancel_run(&thread_id, &run.id).await;
                    return Err(RelayError::RunCancelled);
                }
                _ = tokio::time::sleep(self.settings.interval) => {}
            }

            run = self.api.get_run(&thread_id, &run.id).await?;
            tracing::debug!(attempt = attempts, status = ?run.status, "run status");

            if run.status == RunStatus::RequiresAction {
                let outputs = self.collect_tool_outputs(run.pending_tool_calls()).await;
                if !outputs.is_empty() {
                    tracing::info!(count = outputs.len(), "submitting tool outputs");
                    self.api
                        .submit_tool_outputs(&thread_id, &run.id, outputs)
                        .await?;
                }
            }
        }

        // 6. 终态处理
        let mut safety = SafetyMeta {
            status: "passed".to_string(),
            violation: None,
        };
        match run.status {
            RunStatus::Completed => {}
            RunStatus::Failed => {
                let code = run
                    .last_error
                    .as_ref()
                    .and_then(|e| e.code.as_deref())
                    .unwrap_or("");
                if code == "content_filter" {
                    return Ok(self.blocked_result(&thread_id, &run, started));
                }
                let message = run
                    .last_error
                    .as_ref()
                    .and_then(|e| e.message.clone())
                    .unwrap_or_else(|| "failed".to_string());
                return Err(RelayError::RunFailed(message));
            }
            RunStatus::Incomplete => {
                let reason = run
                    .incomplete_details
                    .as_ref()
                    .and_then(|d| d.reason.as_deref());
                if reason == Some("content_filter") {
                    safety.status = "truncated".to_string();
                    safety.violation =
                        Some("Response truncated due to safety violation".to_string());
                }
            }
            RunStatus::Cancelled => return Err(RelayError::RunCancelled),
            RunStatus::Expired => return Err(RelayError::RunTimeout),
            other => return Err(RelayError::RunFailed(format!("{:?}", other))),
        }

        // 7. 提取
        self.extract_result(&thread_id, &run, started, safety).await
    }

    /// 为待处理批次里的每个调用产出一个输出：已注册工具执行其结果，
    /// 未注册的提交显式错误占位，保证批次完整、运行不会停在 requires_action
    /// 直到厂商侧过期
    async fn collect_tool_outputs(&self, calls: &[ToolCall]) -> Vec<ToolOutput> {
        let mut outputs = Vec::with_capacity(calls.len());
        for call in calls {
            let name = call.function.as_ref().map(|f| f.name.as_str()).unwrap_or("");
            let output = match self.tools.get(name) {
                Some(tool) => {
                    let args: Value = call
                        .function
                        .as_ref()
                        .and_then(|f| serde_json::from_str(&f.arguments).ok())
                        .unwrap_or(Value::Null);
                    tracing::info!(tool = name, "executing tool call");
                    match tool.execute(args).await {
                        Ok(out) => out,
                        Err(e) => {
                            tracing::warn!(tool = name, error = %e, "tool returned error");
                            serde_json::json!({ "error": e }).to_string()
                        }
                    }
                }
                None => {
                    tracing::warn!(tool = name, "unknown tool requested by run");
                    serde_json::json!({ "error": format!("unknown tool: {}", name) }).to_string()
                }
            };
            outputs.push(ToolOutput {
                tool_call_id: call.id.clone(),
                output,
            });
        }
        outputs
    }

    fn blocked_result(&self, thread_id: &str, run: &Run, started: Instant) -> AgentTurnResult {
        AgentTurnResult {
            id: format!("blocked-{}", chrono::Utc::now().timestamp()),
            content: BLOCKED_CONTENT.to_string(),
            sources: Vec::new(),
            thread_id: thread_id.to_string(),
            meta: TurnMeta {
                duration_ms: started.elapsed().as_millis() as u64,
                tokens: None,
                tool_used: false,
                tool_names: Vec::new(),
                model: run.model.clone(),
                safety: SafetyMeta {
                    status: "blocked".to_string(),
                    violation: Some("Content Filter Triggered".to_string()),
                },
                citations: Vec::new(),
            },
        }
    }

    async fn extract_result(
        &self,
        thread_id: &str,
        run: &Run,
        started: Instant,
        safety: SafetyMeta,
    ) -> Result<AgentTurnResult, RelayError> {
        // 步骤获取失败不致命，只损失工具元数据
        let (tool_used, tool_names) = match self.api.list_run_steps(thread_id, &run.id).await {
            Ok(steps) => {
                let mut names: Vec<String> = Vec::new();
                let mut used = false;
                for step in &steps {
                    for name in step.tool_names() {
                        used = true;
                        if !names.contains(&name) {
                            names.push(name);
                        }
                    }
                }
                (used, names)
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not fetch run steps");
                (false, Vec::new())
            }
        };

        let messages = self.api.list_messages(thread_id).await?;
        let assistant = messages
            .iter()
            .find(|m| m.role == MessageRole::Assistant);

        let extracted = assistant
            .and_then(|m| extract_content(&m.content))
            .unwrap_or_default();

        let sources = if extracted.annotated {
            vec!["Source Citation".to_string()]
        } else {
            Vec::new()
        };

        let tokens = run.usage.as_ref().map(|u| TokenCounts {
            prompt: u.prompt_tokens,
            completion: u.completion_tokens,
            total: u.total_tokens,
        });

        let id = assistant
            .map(|m| m.id.clone())
            .unwrap_or_else(|| format!("msg-{}", uuid::Uuid::new_v4()));

        tracing::info!(chars = extracted.text.len(), "turn completed");
        Ok(AgentTurnResult {
            id,
            content: extracted.text,
            sources,
            thread_id: thread_id.to_string(),
            meta: TurnMeta {
                duration_ms: started.elapsed().as_millis() as u64,
                tokens,
                tool_used,
                tool_names,
                model: run.model.clone(),
                safety,
                citations: extracted.citations,
            },
        })
    }
}
