/// 带 OAuth2 Bearer Token 的 HTTP 客户端
///
/// 一次进程只构建一个 `reqwest::Client`，所有 API 调用复用同一连接池
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::error::ApiError;

/// 构建 HTTP 客户端
pub fn build_client() -> Result<Client, ApiError> {
    let client = Client::builder()
        // 超时配置
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .redirect(reqwest::redirect::Policy::limited(5))
        .user_agent(concat!("google-api-cli/", env!("CARGO_PKG_VERSION")))
        .build()?;

    Ok(client)
}

/// 在根地址后追加路径段
///
/// 每个段单独做百分号编码，ID 中的 `/`、`?`、`#` 不会改变请求的资源
pub fn endpoint(base: &str, segments: &[&str]) -> Result<String, ApiError> {
    let mut url =
        Url::parse(base).map_err(|e| ApiError::Endpoint(format!("{}: {}", base, e)))?;

    url.path_segments_mut()
        .map_err(|_| ApiError::Endpoint(base.to_string()))?
        .pop_if_empty()
        .extend(segments);

    Ok(url.into())
}

/// Google REST API 客户端
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    access_token: String,
}

impl ApiClient {
    /// # Arguments
    /// * `access_token` - 有效的 Access Token（明文）
    pub fn new(client: Client, access_token: String) -> Self {
        Self {
            client,
            access_token,
        }
    }

    /// GET 请求
    pub async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<Value, ApiError> {
        let builder = self.client.get(url).query(query).bearer_auth(&self.access_token);
        execute(builder).await
    }

    /// POST 请求（JSON 请求体）
    pub async fn post(&self, url: &str, body: &Value) -> Result<Value, ApiError> {
        let builder = self.client.post(url).bearer_auth(&self.access_token).json(body);
        execute(builder).await
    }

    /// DELETE 请求
    pub async fn delete(&self, url: &str) -> Result<Value, ApiError> {
        let builder = self.client.delete(url).bearer_auth(&self.access_token);
        execute(builder).await
    }
}

/// 发送请求并按 Google API 约定处理响应
async fn execute(builder: RequestBuilder) -> Result<Value, ApiError> {
    let response = builder.send().await?;
    let status = response.status();
    tracing::debug!("响应状态: {} {}", status, response.url().path());

    let body = response.text().await?;

    if !status.is_success() {
        let message = extract_error_message(&body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());
        tracing::debug!("Google API 返回错误 {}: {}", status, body);
        return Err(ApiError::Status {
            status: status.as_u16(),
            message,
        });
    }

    // 空响应体（如 DELETE 返回 204）
    if body.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }

    serde_json::from_str(&body).map_err(|e| ApiError::Decode(format!("invalid JSON: {}", e)))
}

/// 提取 Google 错误响应中的 message
///
/// 格式：`{"error": {"code": 404, "message": "Not Found", "errors": [...]}}`
fn extract_error_message(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    let error = parsed.get("error")?;

    error
        .get("message")
        .and_then(Value::as_str)
        // OAuth 端点的错误格式：{"error": "invalid_grant", "error_description": "..."}
        .or_else(|| parsed.get("error_description").and_then(Value::as_str))
        .or_else(|| error.as_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_server::{FakeResponse, TestServer};

    #[test]
    fn test_extract_error_message() {
        let body = r#"{"error":{"code":404,"message":"Requested entity was not found.","errors":[]}}"#;
        assert_eq!(
            extract_error_message(body).as_deref(),
            Some("Requested entity was not found.")
        );

        let oauth = r#"{"error":"invalid_grant","error_description":"Bad Request"}"#;
        assert_eq!(extract_error_message(oauth).as_deref(), Some("Bad Request"));

        assert!(extract_error_message("<html>oops</html>").is_none());
    }

    #[test]
    fn test_endpoint_encodes_each_segment() {
        assert_eq!(
            endpoint("https://www.googleapis.com/calendar/v3", &["calendars", "primary", "events"])
                .unwrap(),
            "https://www.googleapis.com/calendar/v3/calendars/primary/events"
        );
        assert_eq!(
            endpoint("http://127.0.0.1:8080/", &["events", "abc?x=1#frag"]).unwrap(),
            "http://127.0.0.1:8080/events/abc%3Fx=1%23frag"
        );
        assert_eq!(
            endpoint("http://127.0.0.1:8080/v1/", &["a/b"]).unwrap(),
            "http://127.0.0.1:8080/v1/a%2Fb"
        );
        assert!(endpoint("not a url", &["x"]).is_err());
    }

    #[tokio::test]
    async fn test_bearer_token_and_query() {
        let server = TestServer::start(|_| FakeResponse::json(200, r#"{"ok":true}"#));
        let api = ApiClient::new(build_client().unwrap(), "token-123".to_string());

        let value = api
            .get(&server.url("/items"), &[("maxResults", "5".to_string())])
            .await
            .unwrap();
        assert_eq!(value["ok"], true);

        let requests = server.requests();
        assert_eq!(requests[0].url, "/items?maxResults=5");
        assert_eq!(requests[0].authorization.as_deref(), Some("Bearer token-123"));
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = TestServer::start(|_| {
            FakeResponse::json(403, r#"{"error":{"code":403,"message":"Insufficient Permission"}}"#)
        });
        let api = ApiClient::new(build_client().unwrap(), "t".to_string());

        let err = api.get(&server.url("/x"), &[]).await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP 403: Insufficient Permission");
    }

    #[tokio::test]
    async fn test_empty_body_on_delete() {
        let server = TestServer::start(|_| FakeResponse::empty(204));
        let api = ApiClient::new(build_client().unwrap(), "t".to_string());

        let value = api.delete(&server.url("/x")).await.unwrap();
        assert!(value.as_object().unwrap().is_empty());
    }
}
