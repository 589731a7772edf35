//! Foundry Assistants 线上类型（threads / runs / messages / steps）
//!
//! 只建模中继用到的字段；消息 content 保留原始 JSON，由 extract 模块按
//! 历史形态逐一尝试解析（厂商响应形态随版本演变）。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 运行状态，terminal 与 active 的划分决定轮询是否继续
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Completed,
    Failed,
    Cancelled,
    Expired,
    Incomplete,
    Cancelling,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// 仍需轮询的状态（requires_action 在提交工具输出后回到 in_progress）
    pub fn is_active(self) -> bool {
        matches!(
            self,
            RunStatus::Queued | RunStatus::InProgress | RunStatus::RequiresAction | RunStatus::Cancelling
        )
    }

    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }
}

/// 运行失败详情（code 为 content_filter 时走安全拦截分支）
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LastError {
    pub code: Option<String>,
    pub message: Option<String>,
}

/// incomplete 状态的原因（content_filter 表示响应被截断）
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IncompleteDetails {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON 字符串形式的参数
    pub arguments: String,
}

/// 待处理的工具调用（requires_action 时由运行给出）
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: Option<FunctionCall>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubmitToolOutputs {
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RequiredAction {
    #[serde(rename = "type")]
    pub action_type: Option<String>,
    pub submit_tool_outputs: Option<SubmitToolOutputs>,
}

/// 提交回运行的工具输出
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

/// token 用量（完成后由运行携带）
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// 一次运行。状态只由厂商推进，中继只读（除提交工具输出外）
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Run {
    pub id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub last_error: Option<LastError>,
    #[serde(default)]
    pub required_action: Option<RequiredAction>,
    #[serde(default)]
    pub usage: Option<RunUsage>,
    #[serde(default)]
    pub incomplete_details: Option<IncompleteDetails>,
}

impl Run {
    /// requires_action 时待处理的工具调用列表
    pub fn pending_tool_calls(&self) -> &[ToolCall] {
        self.required_action
            .as_ref()
            .and_then(|a| a.submit_tool_outputs.as_ref())
            .map(|s| s.tool_calls.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    #[serde(other)]
    Other,
}

/// 线程消息。content 为原始 JSON，交由 extract 模块解析
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThreadMessage {
    pub id: String,
    pub role: MessageRole,
    #[serde(default)]
    pub content: Value,
}

/// 运行步骤（仅用于工具使用可观测性，获取失败不致命）
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunStep {
    pub id: String,
    #[serde(rename = "type")]
    pub step_type: String,
    #[serde(default)]
    pub step_details: Option<Value>,
}

impl RunStep {
    /// 从步骤详情提取实际执行过的工具名（function 名优先，否则调用类型）
    pub fn tool_names(&self) -> Vec<String> {
        if self.step_type != "tool_calls" {
            return Vec::new();
        }
        let calls = self
            .step_details
            .as_ref()
            .and_then(|d| d.get("tool_calls"))
            .and_then(|v| v.as_array());
        let Some(calls) = calls else {
            return Vec::new();
        };
        calls
            .iter()
            .map(|tc| {
                tc.get("function")
                    .and_then(|f| f.get("name"))
                    .and_then(|n| n.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| {
                        tc.get("type")
                            .and_then(|t| t.as_str())
                            .unwrap_or("unknown")
                            .to_string()
                    })
            })
            .collect()
    }
}

/// 项目内的智能体元数据
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub tools: Vec<Value>,
    #[serde(default)]
    pub tool_resources: Option<Value>,
    /// Unix 时间戳（秒）
    #[serde(default)]
    pub created_at: Option<i64>,
}

impl AgentInfo {
    /// 渲染工具列表：function 类型为 `fn:<name>`，其余为类型名
    pub fn tool_labels(&self) -> Vec<String> {
        self.tools
            .iter()
            .map(|t| {
                let fn_name = t
                    .get("function")
                    .and_then(|f| f.get("name"))
                    .and_then(|n| n.as_str());
                match fn_name {
                    Some(name) => format!("fn:{}", name),
                    None => t
                        .get("type")
                        .and_then(|v| v.as_str())
                        .unwrap_or("unknown")
                        .to_string(),
                }
            })
            .collect()
    }

    /// file_search 绑定的向量库 ID 列表
    pub fn vector_store_ids(&self) -> Vec<String> {
        self.tool_resources
            .as_ref()
            .and_then(|r| r.get("file_search"))
            .and_then(|fs| fs.get("vector_store_ids"))
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// created_at 转 RFC 3339 字符串
    pub fn created_at_iso(&self) -> Option<String> {
        self.created_at
            .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
            .map(|dt| dt.to_rfc3339())
    }
}

/// 列表响应包装（data 数组）
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_run_status_parsing_and_phases() {
        let run: Run = serde_json::from_value(json!({
            "id": "run_1",
            "status": "requires_action",
            "required_action": {
                "type": "submit_tool_outputs",
                "submit_tool_outputs": {
                    "tool_calls": [
                        {"id": "call_1", "type": "function",
                         "function": {"name": "getFactCard", "arguments": "{\"name\":\"x\"}"}}
                    ]
                }
            }
        }))
        .unwrap();
        assert!(run.status.is_active());
        assert_eq!(run.pending_tool_calls().len(), 1);
        assert_eq!(
            run.pending_tool_calls()[0].function.as_ref().unwrap().name,
            "getFactCard"
        );

        let done: RunStatus = serde_json::from_value(json!("completed")).unwrap();
        assert!(done.is_terminal());
        let odd: RunStatus = serde_json::from_value(json!("something_new")).unwrap();
        assert_eq!(odd, RunStatus::Unknown);
    }

    #[test]
    fn test_step_tool_names() {
        let step: RunStep = serde_json::from_value(json!({
            "id": "step_1",
            "type": "tool_calls",
            "step_details": {
                "type": "tool_calls",
                "tool_calls": [
                    {"id": "c1", "type": "function", "function": {"name": "getFactCard", "output": "{}"}},
                    {"id": "c2", "type": "file_search"}
                ]
            }
        }))
        .unwrap();
        assert_eq!(step.tool_names(), vec!["getFactCard", "file_search"]);

        let msg_step: RunStep = serde_json::from_value(json!({
            "id": "step_2",
            "type": "message_creation"
        }))
        .unwrap();
        assert!(msg_step.tool_names().is_empty());
    }

    #[test]
    fn test_agent_tool_labels_and_vector_stores() {
        let agent: AgentInfo = serde_json::from_value(json!({
            "id": "asst_123",
            "name": "aescher2",
            "model": "gpt-4o",
            "tools": [
                {"type": "function", "function": {"name": "getFactCard", "parameters": {}}},
                {"type": "file_search"}
            ],
            "tool_resources": {
                "file_search": {"vector_store_ids": ["vs_1", "vs_2"]}
            },
            "created_at": 1700000000
        }))
        .unwrap();
        assert_eq!(agent.tool_labels(), vec!["fn:getFactCard", "file_search"]);
        assert_eq!(agent.vector_store_ids(), vec!["vs_1", "vs_2"]);
        assert!(agent.created_at_iso().unwrap().starts_with("2023-11-14"));
    }
}
