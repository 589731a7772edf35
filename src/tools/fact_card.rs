//! 事实卡查询工具：按名称向外部端点发起一次 GET
//!
//! 失败不抛错：非 2xx 与网络错误都转成 JSON 错误载荷返回，由智能体决定
//! 如何向用户解释。不重试。

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::Tool;

/// 厂商侧定义的 function 名
pub const FACT_CARD_TOOL_NAME: &str = "getFactCard";

/// 事实卡工具：GET {url}?name=<查询名>，查询名经 URL 编码
pub struct FactCardTool {
    client: reqwest::Client,
    url: String,
}

impl FactCardTool {
    pub fn new(url: &str, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            url: url.to_string(),
        }
    }

    async fn lookup(&self, name: &str) -> String {
        tracing::info!(name, "calling fact card endpoint");
        // .query() 负责 URL 编码
        let resp = self.client.get(&self.url).query(&[("name", name)]).send().await;

        let resp = match resp {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "fact card request failed");
                return serde_json::json!({"error": "Connection to fact card service failed."})
                    .to_string();
            }
        };

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            return serde_json::json!({"error": format!("Fact card service returned {}", status)})
                .to_string();
        }

        match resp.json::<Value>().await {
            Ok(data) => {
                let records = data.as_array().map(|a| a.len()).unwrap_or(0);
                tracing::info!(records, "fact card endpoint returned");
                data.to_string()
            }
            Err(e) => {
                tracing::warn!(error = %e, "fact card response was not JSON");
                serde_json::json!({"error": "Fact card service returned invalid data."}).to_string()
            }
        }
    }
}

#[async_trait]
impl Tool for FactCardTool {
    fn name(&self) -> &str {
        FACT_CARD_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Look up a fact card by name from the external registry"
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let name = args.get("name").and_then(|v| v.as_str()).unwrap_or("");
        Ok(self.lookup(name).await)
    }
}
