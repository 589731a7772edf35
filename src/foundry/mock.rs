//! Mock 厂商 API（用于测试，无需网络）
//!
//! get_run 按脚本队列逐次出队，队列耗尽后返回兜底运行（可模拟永不结束的
//! 轮询）。所有写操作都被记录，便于断言提交次数与取消行为。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::RelayError;
use crate::foundry::client::AgentsApi;
use crate::foundry::types::{
    AgentInfo, Run, RunStatus, RunStep, ThreadMessage, ToolOutput,
};

/// 构造最小 Run（测试脚本用）
pub fn mock_run(id: &str, status: RunStatus) -> Run {
    Run {
        id: id.to_string(),
        status,
        thread_id: None,
        model: Some("gpt-4o".to_string()),
        last_error: None,
        required_action: None,
        usage: None,
        incomplete_details: None,
    }
}

#[derive(Default)]
struct MockState {
    next_thread: u32,
    run_script: VecDeque<Run>,
    fallback_run: Option<Run>,
    messages: Vec<ThreadMessage>,
    steps: Vec<RunStep>,
    steps_fail: bool,
    agents: Vec<AgentInfo>,

    created_threads: Vec<String>,
    created_messages: Vec<(String, String, String)>,
    submitted_outputs: Vec<Vec<ToolOutput>>,
    cancelled: Vec<(String, String)>,
    list_agents_calls: u32,
}

/// 脚本化 Mock：create_run 返回脚本第一项，get_run 依次出队
#[derive(Default)]
pub struct MockAgentsApi {
    state: Mutex<MockState>,
}

impl MockAgentsApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一次 get_run / create_run 的脚本结果
    pub fn push_run(&self, run: Run) {
        self.state.lock().unwrap().run_script.push_back(run);
    }

    /// 脚本耗尽后 get_run 一直返回的运行（默认 in_progress）
    pub fn set_fallback_run(&self, run: Run) {
        self.state.lock().unwrap().fallback_run = Some(run);
    }

    pub fn set_messages(&self, messages: Vec<ThreadMessage>) {
        self.state.lock().unwrap().messages = messages;
    }

    pub fn set_steps(&self, steps: Vec<RunStep>) {
        self.state.lock().unwrap().steps = steps;
    }

    /// 让 list_run_steps 返回错误（验证步骤获取失败不致命）
    pub fn fail_steps(&self) {
        self.state.lock().unwrap().steps_fail = true;
    }

    pub fn set_agents(&self, agents: Vec<AgentInfo>) {
        self.state.lock().unwrap().agents = agents;
    }

    pub fn created_threads(&self) -> Vec<String> {
        self.state.lock().unwrap().created_threads.clone()
    }

    pub fn created_messages(&self) -> Vec<(String, String, String)> {
        self.state.lock().unwrap().created_messages.clone()
    }

    pub fn submitted_outputs(&self) -> Vec<Vec<ToolOutput>> {
        self.state.lock().unwrap().submitted_outputs.clone()
    }

    pub fn cancelled_runs(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().cancelled.clone()
    }

    pub fn list_agents_calls(&self) -> u32 {
        self.state.lock().unwrap().list_agents_calls
    }

    fn next_run(&self) -> Run {
        let mut state = self.state.lock().unwrap();
        if let Some(run) = state.run_script.pop_front() {
            return run;
        }
        state
            .fallback_run
            .clone()
            .unwrap_or_else(|| mock_run("run_fallback", RunStatus::InProgress))
    }
}

#[async_trait]
impl AgentsApi for MockAgentsApi {
    async fn create_thread(&self) -> Result<String, RelayError> {
        let mut state = self.state.lock().unwrap();
        state.next_thread += 1;
        let id = format!("thread_{}", state.next_thread);
        state.created_threads.push(id.clone());
        Ok(id)
    }

    async fn create_message(
        &self,
        thread_id: &str,
        role: &str,
        content: &str,
    ) -> Result<(), RelayError> {
        self.state.lock().unwrap().created_messages.push((
            thread_id.to_string(),
            role.to_string(),
            content.to_string(),
        ));
        Ok(())
    }

    async fn create_run(&self, _thread_id: &str, _agent_id: &str) -> Result<Run, RelayError> {
        Ok(self.next_run())
    }

    async fn get_run(&self, _thread_id: &str, _run_id: &str) -> Result<Run, RelayError> {
        Ok(self.next_run())
    }

    async fn submit_tool_outputs(
        &self,
        _thread_id: &str,
        _run_id: &str,
        outputs: Vec<ToolOutput>,
    ) -> Result<Run, RelayError> {
        let mut state = self.state.lock().unwrap();
        state.submitted_outputs.push(outputs);
        Ok(state
            .fallback_run
            .clone()
            .unwrap_or_else(|| mock_run("run_fallback", RunStatus::InProgress)))
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<(), RelayError> {
        self.state
            .lock()
            .unwrap()
            .cancelled
            .push((thread_id.to_string(), run_id.to_string()));
        Ok(())
    }

    async fn list_run_steps(
        &self,
        _thread_id: &str,
        _run_id: &str,
    ) -> Result<Vec<RunStep>, RelayError> {
        let state = self.state.lock().unwrap();
        if state.steps_fail {
            return Err(RelayError::Api("steps unavailable".to_string()));
        }
        Ok(state.steps.clone())
    }

    async fn list_messages(&self, _thread_id: &str) -> Result<Vec<ThreadMessage>, RelayError> {
        Ok(self.state.lock().unwrap().messages.clone())
    }

    async fn list_agents(&self) -> Result<Vec<AgentInfo>, RelayError> {
        let mut state = self.state.lock().unwrap();
        state.list_agents_calls += 1;
        Ok(state.agents.clone())
    }
}
