/// Token 文件存储模块
///
/// 负责将凭据持久化到 token.json（单账户，覆盖式写入，无文件锁）
use anyhow::{Context, Result};
use std::path::Path;

use crate::auth::types::Credential;

/// 加载已保存的凭据
///
/// 文件不存在、读取失败或格式不兼容时都返回 `None`（视为没有凭据）
pub fn load_credential(path: &Path) -> Option<Credential> {
    if !path.exists() {
        tracing::debug!("Token 文件不存在: {}", path.display());
        return None;
    }

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!("⚠️ 读取 Token 文件失败 {}: {}", path.display(), e);
            return None;
        }
    };

    match serde_json::from_str::<Credential>(&content) {
        Ok(credential) => {
            tracing::debug!("成功加载 Token: {}", credential.redacted_token());
            Some(credential)
        }
        Err(e) => {
            tracing::warn!("⚠️ Token 文件损坏或格式不兼容，忽略: {}", e);
            None
        }
    }
}

/// 保存凭据
///
/// 覆盖式保存，不与旧内容合并
///
/// # Errors
/// - 序列化失败
/// - 目录创建或文件写入失败
pub fn save_credential(path: &Path, credential: &Credential) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("创建配置目录失败: {}", dir.display()))?;
        }
    }

    let content = serde_json::to_string_pretty(credential).context("序列化 Token 失败")?;

    std::fs::write(path, content)
        .with_context(|| format!("写入 Token 文件失败: {}", path.display()))?;

    tracing::debug!("成功保存 Token 到: {}", path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn create_test_credential(token: &str) -> Credential {
        Credential {
            access_token: Some(token.to_string()),
            refresh_token: Some("test_refresh_token".to_string()),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            scopes: vec!["https://www.googleapis.com/auth/calendar".to_string()],
            expiry: Some(Utc::now() + chrono::Duration::hours(1)),
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");

        let credential = create_test_credential("test_access_token");
        save_credential(&path, &credential).unwrap();

        let loaded = load_credential(&path).unwrap();
        assert_eq!(loaded, credential);
    }

    #[test]
    fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");

        save_credential(&path, &create_test_credential("first")).unwrap();
        save_credential(&path, &create_test_credential("second")).unwrap();

        let loaded = load_credential(&path).unwrap();
        assert_eq!(loaded.access_token.as_deref(), Some("second"));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_credential(&dir.path().join("token.json")).is_none());
    }

    #[test]
    fn test_corrupt_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");

        std::fs::write(&path, "{ not json").unwrap();
        assert!(load_credential(&path).is_none());

        // 结构不兼容（缺少 client_id）
        std::fs::write(&path, r#"{"token":"abc","token_uri":"x"}"#).unwrap();
        assert!(load_credential(&path).is_none());
    }

    #[test]
    fn test_save_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("token.json");

        save_credential(&path, &create_test_credential("abc")).unwrap();
        assert!(path.exists());
    }
}
