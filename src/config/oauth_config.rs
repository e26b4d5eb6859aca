/// OAuth2 客户端密钥读取模块
///
/// 解析从 Google Cloud Console 下载的 `credentials.json`，
/// 支持 Desktop (`installed`) 与 Web (`web`) 两种应用类型
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// OAuth2 客户端密钥（只读）
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthConfig {
    /// Google OAuth2 客户端 ID
    pub client_id: String,

    /// Google OAuth2 客户端密钥
    #[serde(default)]
    pub client_secret: String,

    /// 授权端点（文件中缺失时使用默认值）
    #[serde(default)]
    pub auth_uri: Option<String>,

    /// Token 端点
    #[serde(default)]
    pub token_uri: Option<String>,
}

/// credentials.json 顶层结构
#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<OAuthConfig>,
    web: Option<OAuthConfig>,
}

impl OAuthConfig {
    /// 从文件加载客户端密钥
    ///
    /// # Errors
    /// - 文件读取失败
    /// - JSON 格式错误
    /// - 既没有 `installed` 也没有 `web` 段
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("读取客户端密钥文件失败: {}", path.display()))?;

        let config = Self::parse(&content)
            .with_context(|| format!("解析客户端密钥文件失败: {}", path.display()))?;

        tracing::info!("✅ 从 {} 加载 OAuth2 客户端配置", path.display());
        Ok(config)
    }

    /// 解析 credentials.json 内容
    pub fn parse(content: &str) -> Result<Self> {
        let file: ClientSecretFile = serde_json::from_str(content)?;

        let config = file
            .installed
            .or(file.web)
            .ok_or_else(|| anyhow::anyhow!("缺少 installed 或 web 段"))?;

        if config.client_id.trim().is_empty() {
            anyhow::bail!("client_id 为空");
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_installed_app() {
        let config = OAuthConfig::parse(
            r#"{"installed":{"client_id":"abc.apps.googleusercontent.com","project_id":"p",
                "auth_uri":"https://accounts.google.com/o/oauth2/auth",
                "token_uri":"https://oauth2.googleapis.com/token",
                "client_secret":"shh","redirect_uris":["http://localhost"]}}"#,
        )
        .unwrap();

        assert_eq!(config.client_id, "abc.apps.googleusercontent.com");
        assert_eq!(config.client_secret, "shh");
        assert_eq!(
            config.token_uri.as_deref(),
            Some("https://oauth2.googleapis.com/token")
        );
    }

    #[test]
    fn test_parse_web_app() {
        let config =
            OAuthConfig::parse(r#"{"web":{"client_id":"web-id","client_secret":"s"}}"#).unwrap();
        assert_eq!(config.client_id, "web-id");
        assert!(config.auth_uri.is_none());
    }

    #[test]
    fn test_parse_rejects_unknown_layout() {
        assert!(OAuthConfig::parse(r#"{"service_account":{}}"#).is_err());
        assert!(OAuthConfig::parse("not json").is_err());
        assert!(OAuthConfig::parse(r#"{"installed":{"client_id":" "}}"#).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = OAuthConfig::load(&dir.path().join("credentials.json"));
        assert!(result.unwrap_err().to_string().contains("读取客户端密钥文件失败"));
    }
}
