//! 厂商 API 层：线上类型、REST 客户端与测试用 Mock

pub mod client;
pub mod mock;
pub mod types;

pub use client::{AgentsApi, FoundryClient};
pub use mock::{mock_run, MockAgentsApi};
pub use types::{
    AgentInfo, FunctionCall, IncompleteDetails, LastError, ListResponse, MessageRole,
    RequiredAction, Run, RunStatus, RunStep, RunUsage, SubmitToolOutputs, ThreadMessage, ToolCall,
    ToolOutput,
};
