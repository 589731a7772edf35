//! Foundry Agents REST 客户端
//!
//! 所有调用带 `api-version` 查询参数与 Bearer Token。AgentsApi trait 是
//! 编排器与厂商之间的接缝，测试用 MockAgentsApi 替换。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::auth::TokenProvider;
use crate::error::RelayError;
use crate::foundry::types::{
    AgentInfo, ListResponse, Run, RunStep, ThreadMessage, ToolOutput,
};

/// 厂商 Agents API 接口（仅中继消费的操作）
#[async_trait]
pub trait AgentsApi: Send + Sync {
    /// 新建会话线程，返回线程 ID
    async fn create_thread(&self) -> Result<String, RelayError>;

    /// 向线程追加一条消息
    async fn create_message(
        &self,
        thread_id: &str,
        role: &str,
        content: &str,
    ) -> Result<(), RelayError>;

    /// 以指定智能体对线程发起运行
    async fn create_run(&self, thread_id: &str, agent_id: &str) -> Result<Run, RelayError>;

    /// 重新读取运行状态
    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run, RelayError>;

    /// 批量提交工具输出
    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: Vec<ToolOutput>,
    ) -> Result<Run, RelayError>;

    /// 取消运行（超时 / 客户端放弃时 best-effort 调用）
    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<(), RelayError>;

    /// 列出运行步骤（工具使用可观测性）
    async fn list_run_steps(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> Result<Vec<RunStep>, RelayError>;

    /// 列出线程消息（最新在前）
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, RelayError>;

    /// 列出凭据可见的全部智能体
    async fn list_agents(&self) -> Result<Vec<AgentInfo>, RelayError>;
}

/// reqwest 实现：项目端点 + api-version + TokenProvider
pub struct FoundryClient {
    client: reqwest::Client,
    endpoint: String,
    api_version: String,
    token: Arc<dyn TokenProvider>,
}

impl FoundryClient {
    pub fn new(endpoint: &str, api_version: &str, token: Arc<dyn TokenProvider>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_version: api_version.to_string(),
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}?api-version={}", self.endpoint, path, self.api_version)
    }

    async fn bearer(&self) -> Result<String, RelayError> {
        self.token.bearer_token().await
    }

    /// 非成功状态统一转 Api 错误（状态码 + 响应体）
    async fn expect_success(resp: reqwest::Response) -> Result<reqwest::Response, RelayError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        Err(RelayError::Api(format!("{}: {}", status, body)))
    }
}

#[async_trait]
impl AgentsApi for FoundryClient {
    async fn create_thread(&self) -> Result<String, RelayError> {
        let resp = self
            .client
            .post(self.url("threads"))
            .bearer_auth(self.bearer().await?)
            .json(&json!({}))
            .send()
            .await?;
        let resp = Self::expect_success(resp).await?;
        let body: serde_json::Value = resp.json().await?;
        body.get("id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| RelayError::Api("thread response missing id".to_string()))
    }

    async fn create_message(
        &self,
        thread_id: &str,
        role: &str,
        content: &str,
    ) -> Result<(), RelayError> {
        let resp = self
            .client
            .post(self.url(&format!("threads/{}/messages", thread_id)))
            .bearer_auth(self.bearer().await?)
            .json(&json!({ "role": role, "content": content }))
            .send()
            .await?;
        Self::expect_success(resp).await?;
        Ok(())
    }

    async fn create_run(&self, thread_id: &str, agent_id: &str) -> Result<Run, RelayError> {
        let resp = self
            .client
            .post(self.url(&format!("threads/{}/runs", thread_id)))
            .bearer_auth(self.bearer().await?)
            .json(&json!({ "assistant_id": agent_id }))
            .send()
            .await?;
        let resp = Self::expect_success(resp).await?;
        Ok(resp.json().await?)
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run, RelayError> {
        let resp = self
            .client
            .get(self.url(&format!("threads/{}/runs/{}", thread_id, run_id)))
            .bearer_auth(self.bearer().await?)
            .send()
            .await?;
        let resp = Self::expect_success(resp).await?;
        Ok(resp.json().await?)
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: Vec<ToolOutput>,
    ) -> Result<Run, RelayError> {
        let resp = self
            .client
            .post(self.url(&format!(
                "threads/{}/runs/{}/submit_tool_outputs",
                thread_id, run_id
            )))
            .bearer_auth(self.bearer().await?)
            .json(&json!({ "tool_outputs": outputs }))
            .send()
            .await?;
        let resp = Self::expect_success(resp).await?;
        Ok(resp.json().await?)
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<(), RelayError> {
        let resp = self
            .client
            .post(self.url(&format!("threads/{}/runs/{}/cancel", thread_id, run_id)))
            .bearer_auth(self.bearer().await?)
            .send()
            .await?;
        Self::expect_success(resp).await?;
        Ok(())
    }

    async fn list_run_steps(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> Result<Vec<RunStep>, RelayError> {
        let resp = self
            .client
            .get(self.url(&format!("threads/{}/runs/{}/steps", thread_id, run_id)))
            .bearer_auth(self.bearer().await?)
            .send()
            .await?;
        let resp = Self::expect_success(resp).await?;
        let list: ListResponse<RunStep> = resp.json().await?;
        Ok(list.data)
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, RelayError> {
        let url = format!(
            "{}&order=desc&limit=20",
            self.url(&format!("threads/{}/messages", thread_id))
        );
        let resp = self
            .client
            .get(url)
            .bearer_auth(self.bearer().await?)
            .send()
            .await?;
        let resp = Self::expect_success(resp).await?;
        let list: ListResponse<ThreadMessage> = resp.json().await?;
        Ok(list.data)
    }

    async fn list_agents(&self) -> Result<Vec<AgentInfo>, RelayError> {
        let resp = self
            .client
            .get(self.url("assistants"))
            .bearer_auth(self.bearer().await?)
            .send()
            .await?;
        let resp = Self::expect_success(resp).await?;
        let list: ListResponse<AgentInfo> = resp.json().await?;
        Ok(list.data)
    }
}
