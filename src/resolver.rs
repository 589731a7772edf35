//! 智能体注册表模式：语义名称 → 运行时 asst_ ID
//!
//! 名称与 ID 的绑定随厂商侧重建而失效，所以缓存是显式对象：回合失败时
//! 由编排器调用 invalidate()，下一回合强制重新解析。

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::RelayError;
use crate::foundry::AgentsApi;

/// 厂商 ID 的字面前缀，带此前缀的名称直接当 ID 使用
const AGENT_ID_PREFIX: &str = "asst_";

/// 单槽缓存的解析器
pub struct AgentResolver {
    api: Arc<dyn AgentsApi>,
    cached: RwLock<Option<String>>,
}

impl AgentResolver {
    pub fn new(api: Arc<dyn AgentsApi>) -> Self {
        Self {
            api,
            cached: RwLock::new(None),
        }
    }

    /// 名称解析为 ID：字面 ID 直接返回；否则列出智能体按显示名精确匹配
    pub async fn resolve(&self, name: &str) -> Result<String, RelayError> {
        if name.starts_with(AGENT_ID_PREFIX) {
            let mut guard = self.cached.write().await;
            *guard = Some(name.to_string());
            return Ok(name.to_string());
        }

        if let Some(id) = self.cached.read().await.as_ref() {
            return Ok(id.clone());
        }

        tracing::info!(name, "resolving semantic agent name");
        let agents = self.api.list_agents().await?;
        let found = agents
            .iter()
            .find(|a| a.name.as_deref() == Some(name));

        let Some(agent) = found else {
            return Err(RelayError::AgentNotFound {
                name: name.to_string(),
                available: agents.iter().filter_map(|a| a.name.clone()).collect(),
            });
        };

        tracing::info!(name, id = %agent.id, "resolved agent");
        *self.cached.write().await = Some(agent.id.clone());
        Ok(agent.id.clone())
    }

    /// 清空缓存槽，下一次 resolve 重新走列表
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }

    /// 当前缓存的 ID（诊断用）
    pub async fn cached_id(&self) -> Option<String> {
        self.cached.read().await.clone()
    }
}
