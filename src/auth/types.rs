/// 凭据数据结构
///
/// 磁盘格式与 Google "authorized user" JSON 保持一致，
/// 刷新所需的 client_id / client_secret / token_uri 一并保存
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OAuth2 凭据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    /// 访问令牌
    #[serde(rename = "token", default)]
    pub access_token: Option<String>,

    /// 刷新令牌
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// 刷新时使用的 Token 端点
    pub token_uri: String,

    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    /// 授权时获得的权限范围
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Access Token 过期时间（UTC）
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl Credential {
    /// 检查 Token 是否即将过期
    ///
    /// # Arguments
    /// * `threshold_minutes` - 提前多少分钟算作"即将过期"
    ///
    /// 没有过期时间的 Token 视为永不过期
    pub fn is_token_expiring(&self, threshold_minutes: i64) -> bool {
        match self.expiry {
            Some(expiry) => {
                let threshold = Utc::now() + chrono::Duration::minutes(threshold_minutes);
                expiry <= threshold
            }
            None => false,
        }
    }

    /// 凭据当前是否可用（有 Access Token 且未进入刷新窗口）
    pub fn is_valid(&self, threshold_minutes: i64) -> bool {
        self.access_token
            .as_deref()
            .is_some_and(|token| !token.is_empty())
            && !self.is_token_expiring(threshold_minutes)
    }

    /// 是否可以通过 Refresh Token 刷新
    pub fn can_refresh(&self) -> bool {
        self.refresh_token
            .as_deref()
            .is_some_and(|token| !token.is_empty())
    }

    /// 更新访问令牌
    ///
    /// 响应中没有新的 Refresh Token 时保留旧值
    pub fn update_access_token(
        &mut self,
        new_token: String,
        new_refresh_token: Option<String>,
        expires_in_seconds: i64,
    ) {
        self.access_token = Some(new_token);
        if let Some(refresh) = new_refresh_token {
            self.refresh_token = Some(refresh);
        }
        self.expiry = Some(Utc::now() + chrono::Duration::seconds(expires_in_seconds));
    }

    /// 日志用的截断 Token
    pub fn redacted_token(&self) -> String {
        match self.access_token.as_deref() {
            Some(token) if token.len() > 10 && token.is_ascii() => {
                format!("{}...{}", &token[..5], &token[token.len() - 5..])
            }
            Some(_) => "***".to_string(),
            None => "<none>".to_string(),
        }
    }
}
