/// 运行配置
///
/// 进程启动时构建一次 `Settings`，显式传入凭据管理器和 API 客户端，
/// 不使用全局可变状态（测试时可注入临时目录和本地端点）。
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub mod oauth_config;
pub mod storage;

/// Calendar + Gmail 所需的权限范围（固定，三者总是一起申请）
pub const SCOPES: [&str; 3] = [
    "https://www.googleapis.com/auth/calendar",      // 日历完整访问
    "https://www.googleapis.com/auth/gmail.modify",  // 读取邮件、修改标签
    "https://www.googleapis.com/auth/gmail.compose", // 创建草稿
];

/// 客户端密钥文件名（用户提供，只读）
pub const CLIENT_SECRET_FILE: &str = "credentials.json";

/// Token 文件名（程序维护，读写）
pub const TOKEN_FILE: &str = "token.json";

/// 新建日历事件默认使用的时区
pub const DEFAULT_TIMEZONE: &str = "America/New_York";

/// 配置目录环境变量
const HOME_ENV: &str = "GOOGLE_API_HOME";

/// 时区环境变量
const TIMEZONE_ENV: &str = "GOOGLE_API_TIMEZONE";

/// 远程端点（默认指向 Google 生产环境）
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub auth_url: String,
    pub token_url: String,
    pub calendar_base: String,
    pub gmail_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            calendar_base: "https://www.googleapis.com/calendar/v3".to_string(),
            gmail_base: "https://gmail.googleapis.com/gmail/v1".to_string(),
        }
    }
}

/// 进程级配置
#[derive(Debug, Clone)]
pub struct Settings {
    /// credentials.json 路径
    pub client_secret_path: PathBuf,

    /// token.json 路径
    pub token_path: PathBuf,

    /// 请求的 API 权限范围
    pub scopes: Vec<String>,

    /// 新建事件使用的时区（IANA 名称）
    pub timezone: String,

    pub endpoints: Endpoints,
}

impl Settings {
    /// 以指定目录构建配置（两个文件位于同一目录）
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            client_secret_path: dir.join(CLIENT_SECRET_FILE),
            token_path: dir.join(TOKEN_FILE),
            scopes: SCOPES.iter().map(|s| s.to_string()).collect(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            endpoints: Endpoints::default(),
        }
    }

    /// 加载配置
    ///
    /// 优先级（从高到低）：
    /// 1. 环境变量：`GOOGLE_API_HOME`, `GOOGLE_API_TIMEZONE`
    /// 2. 可执行文件所在目录 / 默认时区
    pub fn load() -> Result<Self> {
        let dir = match std::env::var_os(HOME_ENV) {
            Some(dir) if !dir.is_empty() => {
                tracing::debug!("从环境变量 {} 读取配置目录", HOME_ENV);
                PathBuf::from(dir)
            }
            _ => program_dir()?,
        };

        let mut settings = Self::in_dir(&dir);

        if let Ok(tz) = std::env::var(TIMEZONE_ENV) {
            if !tz.trim().is_empty() {
                settings.timezone = tz.trim().to_string();
            }
        }

        tracing::debug!(
            "配置目录: {}，时区: {}",
            dir.display(),
            settings.timezone
        );

        Ok(settings)
    }
}

/// 可执行文件所在目录
fn program_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("无法获取可执行文件路径")?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow::anyhow!("可执行文件没有父目录: {}", exe.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_dir_colocates_files() {
        let settings = Settings::in_dir(Path::new("/tmp/gapi"));
        assert_eq!(
            settings.client_secret_path,
            PathBuf::from("/tmp/gapi/credentials.json")
        );
        assert_eq!(settings.token_path, PathBuf::from("/tmp/gapi/token.json"));
        assert_eq!(settings.timezone, "America/New_York");
    }

    #[test]
    fn test_scopes_cover_calendar_and_gmail() {
        let settings = Settings::in_dir(Path::new("."));
        assert_eq!(settings.scopes.len(), 3);
        assert!(settings.scopes.iter().any(|s| s.ends_with("/calendar")));
        assert!(settings.scopes.iter().any(|s| s.ends_with("gmail.modify")));
        assert!(settings.scopes.iter().any(|s| s.ends_with("gmail.compose")));
    }

    #[test]
    fn test_default_endpoints() {
        let endpoints = Endpoints::default();
        assert!(endpoints.token_url.starts_with("https://oauth2.googleapis.com"));
        assert!(endpoints.gmail_base.ends_with("/gmail/v1"));
        assert!(endpoints.calendar_base.ends_with("/calendar/v3"));
    }
}
