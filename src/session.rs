//! 会话注册表：客户端会话 ID → 厂商线程 ID
//!
//! 进程内存映射，不持久化、不淘汰；重启后同一会话 ID 会透明开启新线程。
//! clear 只移除映射，远端线程不删除。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::RelayError;
use crate::foundry::AgentsApi;

/// 一个会话同时只有一个在用线程
pub struct SessionRegistry {
    api: Arc<dyn AgentsApi>,
    threads: RwLock<HashMap<String, String>>,
}

impl SessionRegistry {
    pub fn new(api: Arc<dyn AgentsApi>) -> Self {
        Self {
            api,
            threads: RwLock::new(HashMap::new()),
        }
    }

    /// 取会话绑定的线程，缺失时创建厂商线程并登记
    pub async fn get_or_create(&self, session_id: &str) -> Result<String, RelayError> {
        if let Some(thread_id) = self.threads.read().await.get(session_id) {
            return Ok(thread_id.clone());
        }

        let thread_id = self.api.create_thread().await?;
        tracing::info!(session_id, %thread_id, "created new thread for session");
        self.threads
            .write()
            .await
            .insert(session_id.to_string(), thread_id.clone());
        Ok(thread_id)
    }

    /// 移除映射（幂等；重复 clear 无害）
    pub async fn clear(&self, session_id: &str) {
        self.threads.write().await.remove(session_id);
    }

    /// 仅查询，不创建
    pub async fn get(&self, session_id: &str) -> Option<String> {
        self.threads.read().await.get(session_id).cloned()
    }
}
