/// Token 管理模块
///
/// 每次调用都产出一个可用的凭据：加载缓存 → 必要时刷新 → 仍不可用时走交互式授权，
/// 刷新或新获取的凭据立即写回 token.json
use anyhow::{Context, Result};
use std::io::Write;
use oauth2::{
    AuthUrl, ClientId, ClientSecret, RefreshToken, RequestTokenError, TokenResponse, TokenUrl,
    basic::{BasicClient, BasicErrorResponseType},
};

use crate::auth::oauth;
use crate::auth::types::Credential;
use crate::config::{Settings, oauth_config::OAuthConfig, storage};
use crate::error::AppError;

/// Token 刷新阈值（提前多少分钟刷新）
const REFRESH_THRESHOLD_MINUTES: i64 = 5;

/// Token 管理器
pub struct TokenManager<'a> {
    settings: &'a Settings,
}

impl<'a> TokenManager<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// 获取有效凭据
    ///
    /// # Errors
    /// - `AppError::Setup`：没有可用凭据且 credentials.json 不存在（此时不发起任何网络请求）
    /// - `AppError::Auth`：交互式授权失败或 Token 写入失败
    /// 刷新失败的提示写入 `diagnostics`（命令行下为 stderr）
    pub async fn obtain(&self, diagnostics: &mut dyn Write) -> Result<Credential, AppError> {
        let cached = match storage::load_credential(&self.settings.token_path) {
            Some(credential) if credential.is_valid(REFRESH_THRESHOLD_MINUTES) => {
                tracing::debug!("使用缓存的 Access Token: {}", credential.redacted_token());
                return Ok(credential);
            }
            other => other,
        };

        // 缓存凭据不可用：先尝试刷新（只尝试一次）
        let refreshed = match cached {
            Some(credential) if credential.can_refresh() => {
                tracing::info!("Access Token 已过期，自动刷新");
                match self.refresh(credential).await {
                    Ok(credential) => Some(credential),
                    Err(e) => {
                        writeln!(diagnostics, "Token refresh failed: {:#}", e).ok();
                        None
                    }
                }
            }
            _ => None,
        };

        let credential = match refreshed {
            Some(credential) => credential,
            None => self.authorize(diagnostics).await?,
        };

        storage::save_credential(&self.settings.token_path, &credential)
            .context("保存 Token 失败")
            .map_err(AppError::Auth)?;

        Ok(credential)
    }

    /// 使用 Refresh Token 换取新的 Access Token
    ///
    /// Token 端点以凭据中记录的 token_uri 为准
    async fn refresh(&self, mut credential: Credential) -> Result<Credential> {
        let refresh_token = credential
            .refresh_token
            .clone()
            .ok_or_else(|| anyhow::anyhow!("缺少 Refresh Token"))?;

        let token_uri = if credential.token_uri.is_empty() {
            self.settings.endpoints.token_url.clone()
        } else {
            credential.token_uri.clone()
        };

        let secret = if credential.client_secret.is_empty() {
            None
        } else {
            Some(ClientSecret::new(credential.client_secret.clone()))
        };

        let client = BasicClient::new(
            ClientId::new(credential.client_id.clone()),
            secret,
            AuthUrl::new(self.settings.endpoints.auth_url.clone())?,
            Some(TokenUrl::new(token_uri)?),
        );

        let token_response = client
            .exchange_refresh_token(&RefreshToken::new(refresh_token))
            .request_async(oauth2::reqwest::async_http_client)
            .await
            .map_err(|e| match e {
                RequestTokenError::ServerResponse(response) => {
                    if *response.error() == BasicErrorResponseType::InvalidGrant {
                        tracing::warn!("❌ Refresh Token 已过期或被撤销");
                    }
                    anyhow::anyhow!("{}", response)
                }
                other => anyhow::anyhow!("{}", other),
            })?;

        let expires_in = token_response
            .expires_in()
            .unwrap_or(std::time::Duration::from_secs(oauth::DEFAULT_EXPIRES_IN_SECS))
            .as_secs() as i64;

        credential.update_access_token(
            token_response.access_token().secret().to_string(),
            token_response.refresh_token().map(|t| t.secret().to_string()),
            expires_in,
        );

        tracing::info!(
            "✅ Access Token 刷新成功（新的过期时间: {:?}）",
            credential.expiry
        );

        Ok(credential)
    }

    /// 交互式授权获取全新凭据
    async fn authorize(&self, diagnostics: &mut dyn Write) -> Result<Credential, AppError> {
        let secret_path = &self.settings.client_secret_path;
        if !secret_path.exists() {
            return Err(AppError::Setup {
                path: secret_path.clone(),
            });
        }

        let config = OAuthConfig::load(secret_path).map_err(AppError::Auth)?;

        oauth::authenticate(&config, self.settings, diagnostics)
            .await
            .map_err(AppError::Auth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_server::{FakeResponse, TestServer};
    use chrono::Utc;

    fn settings(dir: &std::path::Path) -> Settings {
        Settings::in_dir(dir)
    }

    fn credential(token_uri: &str, expiry: chrono::DateTime<Utc>) -> Credential {
        Credential {
            access_token: Some("old_access_token".to_string()),
            refresh_token: Some("valid_refresh_token".to_string()),
            token_uri: token_uri.to_string(),
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            scopes: crate::config::SCOPES.iter().map(|s| s.to_string()).collect(),
            expiry: Some(expiry),
        }
    }

    #[tokio::test]
    async fn test_valid_cached_token_is_returned_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());

        // token_uri 指向不可达地址：若发生刷新请求则测试失败
        let cached = credential("http://127.0.0.1:9/token", Utc::now() + chrono::Duration::hours(1));
        storage::save_credential(&settings.token_path, &cached).unwrap();

        let obtained = TokenManager::new(&settings).obtain(&mut std::io::sink()).await.unwrap();
        assert_eq!(obtained, cached);
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_and_persisted() {
        let server = TestServer::start(|req| {
            assert_eq!(req.method, "POST");
            assert!(req.body.contains("grant_type=refresh_token"));
            assert!(req.body.contains("refresh_token=valid_refresh_token"));
            FakeResponse::json(
                200,
                r#"{"access_token":"new_access_token","expires_in":3599,"token_type":"Bearer"}"#,
            )
        });

        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let expired = credential(
            &server.url("/token"),
            Utc::now() - chrono::Duration::hours(1),
        );
        storage::save_credential(&settings.token_path, &expired).unwrap();

        // credentials.json 不存在：若走交互式授权会返回 Setup 错误
        let obtained = TokenManager::new(&settings).obtain(&mut std::io::sink()).await.unwrap();

        assert_eq!(obtained.access_token.as_deref(), Some("new_access_token"));
        assert_eq!(obtained.refresh_token.as_deref(), Some("valid_refresh_token"));
        assert!(obtained.is_valid(REFRESH_THRESHOLD_MINUTES));

        let stored = storage::load_credential(&settings.token_path).unwrap();
        assert_eq!(stored, obtained);
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_falls_back_to_setup_error() {
        let server = TestServer::start(|_| {
            FakeResponse::json(
                400,
                r#"{"error":"invalid_grant","error_description":"Token has been expired or revoked."}"#,
            )
        });

        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let expired = credential(
            &server.url("/token"),
            Utc::now() - chrono::Duration::hours(1),
        );
        storage::save_credential(&settings.token_path, &expired).unwrap();

        let mut diagnostics = Vec::new();
        let err = TokenManager::new(&settings).obtain(&mut diagnostics).await.unwrap_err();
        assert!(matches!(err, AppError::Setup { .. }));

        let diagnostics = String::from_utf8(diagnostics).unwrap();
        assert!(diagnostics.starts_with("Token refresh failed: "));
        assert!(diagnostics.contains("invalid_grant"));
        assert_eq!(diagnostics.lines().count(), 1);

        // 只尝试刷新一次，不重试
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_setup_without_token() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());

        let err = TokenManager::new(&settings).obtain(&mut std::io::sink()).await.unwrap_err();
        match err {
            AppError::Setup { path } => assert_eq!(path, settings.client_secret_path),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!settings.token_path.exists());
    }

    #[tokio::test]
    async fn test_corrupt_token_without_setup() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        std::fs::write(&settings.token_path, "garbage").unwrap();

        let err = TokenManager::new(&settings).obtain(&mut std::io::sink()).await.unwrap_err();
        assert!(matches!(err, AppError::Setup { .. }));
    }
}
