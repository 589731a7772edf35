//! 中继错误类型
//!
//! 安全拦截（content_filter）不是错误：编排器会返回带 safety 标记的正常结果。
//! 工具执行失败也不在此列——工具错误作为 JSON 载荷回传给智能体。

use thiserror::Error;

/// 一次智能体回合中可能出现的错误（解析、提交、运行、超时等）
#[derive(Error, Debug)]
pub enum RelayError {
    /// 按名称解析智能体失败，附可用名称列表便于排查
    #[error("Agent \"{name}\" not found in project. Available agents: {}", .available.join(", "))]
    AgentNotFound { name: String, available: Vec<String> },

    #[error("Failed to add message: {0}")]
    MessageSubmission(String),

    #[error("Failed to create run: {0}")]
    RunCreation(String),

    #[error("Run failed: {0}")]
    RunFailed(String),

    #[error("Run timed out")]
    RunTimeout,

    #[error("Run cancelled")]
    RunCancelled,

    #[error("Tool execution failed: {0}")]
    ToolExecution(String),

    #[error("Token acquisition failed: {0}")]
    Auth(String),

    /// 厂商 API 返回非成功状态码（含状态与响应体）
    #[error("Foundry API error: {0}")]
    Api(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}
