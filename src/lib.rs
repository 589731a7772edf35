//! Foundry Relay - Azure AI Foundry 智能体中继服务
//!
//! 模块划分：
//! - **auth**: Entra ID 凭据与 Token 缓存
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **extract**: 响应内容提取策略（按历史形态排序）
//! - **foundry**: 厂商 Agents API（类型、REST 客户端、Mock）
//! - **orchestrator**: 回合状态机（轮询 + 工具调用编排）
//! - **resolver**: 语义名称 → asst_ ID 解析（单槽缓存）
//! - **server**: axum 中继端点
//! - **session**: 会话 → 线程注册表
//! - **tools**: 工具箱（事实卡查询）

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod foundry;
pub mod orchestrator;
pub mod resolver;
pub mod server;
pub mod session;
pub mod tools;

pub use error::RelayError;
