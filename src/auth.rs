//! Entra ID 凭据：client_credentials 流程获取 Bearer Token
//!
//! Token 缓存在单槽中，临近过期（60 秒裕量）自动重取。测试与用户自带
//! Token 的场景用 StaticTokenProvider。

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::error::RelayError;

/// 厂商 API 请求的默认 scope
const DEFAULT_SCOPE: &str = "https://cognitiveservices.azure.com/.default";

/// 过期前多久视为失效
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Token 提供者 trait：后端服务凭据或用户交互登录都实现此接口
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn bearer_token(&self) -> Result<String, RelayError>;
}

/// 固定 Token（测试 / 前端透传场景）
pub struct StaticTokenProvider(pub String);

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn bearer_token(&self) -> Result<String, RelayError> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// 服务间认证：向 login.microsoftonline.com 换取访问令牌并缓存
pub struct ClientSecretProvider {
    client: reqwest::Client,
    tenant_id: String,
    client_id: String,
    client_secret: String,
    scope: String,
    cached: RwLock<Option<CachedToken>>,
}

impl ClientSecretProvider {
    pub fn new(tenant_id: &str, client_id: &str, client_secret: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            tenant_id: tenant_id.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            cached: RwLock::new(None),
        }
    }

    async fn fetch_token(&self) -> Result<CachedToken, RelayError> {
        let url = format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
            self.tenant_id
        );
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];
        let resp = self.client.post(&url).form(&params).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(RelayError::Auth(format!("{}: {}", status, body)));
        }
        let tr: TokenResponse = resp.json().await?;
        let lifetime = Duration::from_secs(tr.expires_in.max(EXPIRY_MARGIN.as_secs() + 1));
        Ok(CachedToken {
            token: tr.access_token,
            expires_at: Instant::now() + lifetime - EXPIRY_MARGIN,
        })
    }
}

#[async_trait]
impl TokenProvider for ClientSecretProvider {
    async fn bearer_token(&self) -> Result<String, RelayError> {
        {
            let guard = self.cached.read().await;
            if let Some(cached) = guard.as_ref() {
                if cached.expires_at > Instant::now() {
                    return Ok(cached.token.clone());
                }
            }
        }
        let fresh = self.fetch_token().await?;
        let token = fresh.token.clone();
        *self.cached.write().await = Some(fresh);
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_provider_returns_fixed_token() {
        let p = StaticTokenProvider("tok-123".to_string());
        assert_eq!(p.bearer_token().await.unwrap(), "tok-123");
        assert_eq!(p.bearer_token().await.unwrap(), "tok-123");
    }
}
