/// Google OAuth2 交互式授权流程
///
/// 实现完整的 OAuth2 授权码流程（带 PKCE），使用本地回环端口接收回调
use anyhow::{Context, Result};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl, basic::BasicClient,
};
use std::io::Write;
use std::time::Duration;
use tiny_http::{Header, Response, Server};
use tokio::sync::oneshot;
use url::Url;

use crate::auth::types::Credential;
use crate::config::{Settings, oauth_config::OAuthConfig};

/// OAuth2 回调超时时间（秒）
const CALLBACK_TIMEOUT_SECS: u64 = 300;

/// 未返回 expires_in 时的默认有效期（秒）
pub(crate) const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

/// OAuth2 成功页面 HTML
const SUCCESS_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Authorization complete</title></head>
<body style="font-family: sans-serif; text-align: center; margin-top: 15%;">
    <h1>Authorization complete</h1>
    <p>You can close this tab and return to the terminal.</p>
</body>
</html>"#;

/// OAuth2 错误页面 HTML
const ERROR_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Authorization failed</title></head>
<body style="font-family: sans-serif; text-align: center; margin-top: 15%;">
    <h1>Authorization failed</h1>
    <p>The request was denied or incomplete. Check the terminal for details.</p>
</body>
</html>"#;

/// 执行交互式授权
///
/// 授权 URL 写入 `prompt`（命令行下为 stderr），浏览器无法打开时用户可手动复制
///
/// 流程：
/// 1. 在 127.0.0.1 的临时端口启动回调服务器
/// 2. 生成授权 URL（PKCE + CSRF state）
/// 3. 打开浏览器（失败时提示手动复制 URL）
/// 4. 同步等待回调
/// 5. 验证 CSRF state
/// 6. 交换 Token
///
/// # Errors
/// - 无法启动本地服务器
/// - 用户拒绝授权 / 超时
/// - Token 交换失败或未返回 refresh_token
pub async fn authenticate(
    config: &OAuthConfig,
    settings: &Settings,
    prompt: &mut dyn Write,
) -> Result<Credential> {
    tracing::info!("🔐 开始 Google OAuth2 认证流程");

    // 步骤 1：启动本地服务器（端口 0 由系统分配）
    let server = Server::http("127.0.0.1:0")
        .map_err(|e| anyhow::anyhow!("无法启动本地回调服务器: {}", e))?;
    let port = server
        .server_addr()
        .to_ip()
        .map(|addr| addr.port())
        .ok_or_else(|| anyhow::anyhow!("回调服务器未监听 TCP 端口"))?;
    let redirect_uri = format!("http://127.0.0.1:{}/", port);
    tracing::info!("✅ 本地服务器启动成功: {}", redirect_uri);

    // 步骤 2：生成授权 URL
    let client = build_client(config, settings, &redirect_uri)?;
    let (auth_url, csrf_state, pkce_verifier) = build_auth_url(&client, &settings.scopes);
    tracing::debug!("授权 URL: {}", auth_url);

    let (code_tx, code_rx) = oneshot::channel();
    let server_handle = std::thread::spawn(move || wait_for_callback(server, port, code_tx));

    // 步骤 3：打开浏览器
    writeln!(
        prompt,
        "Please visit this URL to authorize this application:\n{}\n",
        auth_url
    )
    .ok();
    if let Err(e) = webbrowser::open(auth_url.as_str()) {
        tracing::warn!("⚠️ 无法打开浏览器，请手动复制上面的 URL: {}", e);
    }

    // 步骤 4：等待回调（带超时）
    let received = tokio::time::timeout(Duration::from_secs(CALLBACK_TIMEOUT_SECS), code_rx)
        .await
        .context("授权超时：未在规定时间内完成授权")?;

    let (received_code, received_state) = match received {
        Ok(pair) => pair,
        // 回调线程提前退出（用户拒绝授权等），取出线程中的真实错误
        Err(_) => {
            return match server_handle.join() {
                Ok(Err(e)) => Err(e),
                _ => Err(anyhow::anyhow!("本地服务器接收回调失败")),
            };
        }
    };

    tracing::info!("✅ 收到授权回调");

    server_handle
        .join()
        .map_err(|_| anyhow::anyhow!("回调服务器线程 panic"))?
        .context("回调服务器关闭时出错")?;

    // 步骤 5：验证 CSRF state
    if received_state.secret() != csrf_state.secret() {
        anyhow::bail!("CSRF 验证失败：state 不匹配");
    }
    tracing::debug!("✅ CSRF 验证通过");

    // 步骤 6：交换 Token
    let token_response = client
        .exchange_code(received_code)
        .set_pkce_verifier(pkce_verifier)
        .request_async(oauth2::reqwest::async_http_client)
        .await
        .map_err(|e| anyhow::anyhow!("Token 交换失败: {}", e))?;

    let refresh_token = token_response
        .refresh_token()
        .ok_or_else(|| anyhow::anyhow!("未收到 refresh_token"))?
        .secret()
        .to_string();

    let expires_in = token_response
        .expires_in()
        .unwrap_or(Duration::from_secs(DEFAULT_EXPIRES_IN_SECS))
        .as_secs() as i64;

    let scopes = token_response
        .scopes()
        .map(|granted| granted.iter().map(|s| s.to_string()).collect())
        .unwrap_or_else(|| settings.scopes.clone());

    let credential = Credential {
        access_token: Some(token_response.access_token().secret().to_string()),
        refresh_token: Some(refresh_token),
        token_uri: token_url(config, settings),
        client_id: config.client_id.clone(),
        client_secret: config.client_secret.clone(),
        scopes,
        expiry: Some(chrono::Utc::now() + chrono::Duration::seconds(expires_in)),
    };

    tracing::info!(
        "🎉 OAuth2 认证完成（Token: {}，有效期: {} 秒）",
        credential.redacted_token(),
        expires_in
    );

    Ok(credential)
}

/// 客户端密钥中的 Token 端点，缺失时使用默认值
fn token_url(config: &OAuthConfig, settings: &Settings) -> String {
    config
        .token_uri
        .clone()
        .unwrap_or_else(|| settings.endpoints.token_url.clone())
}

/// 构建 OAuth2 客户端
fn build_client(
    config: &OAuthConfig,
    settings: &Settings,
    redirect_uri: &str,
) -> Result<BasicClient> {
    let secret = if config.client_secret.is_empty() {
        None
    } else {
        Some(ClientSecret::new(config.client_secret.clone()))
    };

    let auth_url = config
        .auth_uri
        .clone()
        .unwrap_or_else(|| settings.endpoints.auth_url.clone());

    Ok(BasicClient::new(
        ClientId::new(config.client_id.clone()),
        secret,
        AuthUrl::new(auth_url)?,
        Some(TokenUrl::new(token_url(config, settings))?),
    )
    .set_redirect_uri(RedirectUrl::new(redirect_uri.to_string())?))
}

/// 生成授权 URL
///
/// 使用 PKCE (RFC 7636)，并请求离线访问以获得 refresh_token
fn build_auth_url(client: &BasicClient, scopes: &[String]) -> (Url, CsrfToken, PkceCodeVerifier) {
    let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

    let (auth_url, csrf_state) = client
        .authorize_url(CsrfToken::new_random)
        .add_scopes(scopes.iter().map(|s| Scope::new(s.clone())))
        .add_extra_param("access_type", "offline")
        .add_extra_param("prompt", "consent")
        .set_pkce_challenge(pkce_challenge)
        .url();

    (auth_url, csrf_state, pkce_verifier)
}

/// 解析回调 URL 中的 code / state
///
/// 返回 `Ok(None)` 表示与授权无关的请求（如 /favicon.ico），继续等待
fn parse_callback(url: &Url) -> Result<Option<(AuthorizationCode, CsrfToken)>> {
    let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

    if let Some(error) = params.get("error") {
        anyhow::bail!("用户拒绝授权: {}", error);
    }

    match (params.get("code"), params.get("state")) {
        (Some(code), Some(state)) => Ok(Some((
            AuthorizationCode::new(code.clone()),
            CsrfToken::new(state.clone()),
        ))),
        (Some(_), None) => anyhow::bail!("回调缺少 state 参数"),
        _ => Ok(None),
    }
}

fn html_response(body: &str) -> Response<std::io::Cursor<Vec<u8>>> {
    let response = Response::from_string(body);
    match Header::from_bytes(&b"Content-Type"[..], &b"text/html; charset=utf-8"[..]) {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}

/// 阻塞等待 OAuth2 回调
fn wait_for_callback(
    server: Server,
    port: u16,
    code_tx: oneshot::Sender<(AuthorizationCode, CsrfToken)>,
) -> Result<()> {
    let deadline = std::time::Instant::now() + Duration::from_secs(CALLBACK_TIMEOUT_SECS);

    loop {
        let remaining = deadline.saturating_duration_since(std::time::Instant::now());
        let Some(request) = server.recv_timeout(remaining)? else {
            anyhow::bail!("等待授权回调超时");
        };

        let url_str = format!("http://127.0.0.1:{}{}", port, request.url());
        tracing::debug!("收到请求: {}", request.url());

        let parsed = match Url::parse(&url_str).context("回调 URL 无效").and_then(|url| parse_callback(&url)) {
            Ok(parsed) => parsed,
            Err(e) => {
                request.respond(html_response(ERROR_HTML).with_status_code(400))?;
                return Err(e);
            }
        };

        match parsed {
            Some((code, state)) => {
                request.respond(html_response(SUCCESS_HTML))?;
                code_tx.send((code, state)).ok();
                return Ok(());
            }
            None => {
                request.respond(Response::empty(404))?;
            }
        }
    }
}
