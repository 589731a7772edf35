//! 工具箱：智能体经 requires_action 请求的外部能力
//!
//! 所有工具实现 Tool trait（name / description / execute），由 ToolRegistry
//! 按名注册与查找。工具失败不中断运行：错误以 JSON 载荷形式作为工具输出
//! 回传，让智能体自行应对。

pub mod fact_card;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

pub use fact_card::FactCardTool;

/// 工具 trait：名称、描述、异步执行（args 为厂商给出的 JSON 参数）
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（需与智能体定义中的 function 名一致）
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// 执行工具，返回 JSON 编码的输出字符串
    async fn execute(&self, args: Value) -> Result<String, String>;
}

/// 工具注册表：按名称存储 Arc<dyn Tool>
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
