/// 错误类型定义
///
/// 远程调用统一返回 `ApiError`，命令层再包装为带组件前缀的 `AppError`，
/// 由 main 统一输出到 stderr 并以退出码 1 结束。
use std::path::PathBuf;

use thiserror::Error;

/// Google REST API 调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 服务端返回非 2xx 状态码
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// 网络层错误（DNS、连接、超时等）
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// 响应体无法解析为预期的 JSON 结构
    #[error("unexpected response: {0}")]
    Decode(String),

    /// 端点根地址无法拼接路径
    #[error("invalid endpoint URL: {0}")]
    Endpoint(String),
}

/// 命令执行错误（每个命令只捕获一次）
#[derive(Debug, Error)]
pub enum AppError {
    /// 缺少 credentials.json
    #[error(
        "Error: credentials.json not found at {}\n\n\
         To set up:\n\
         1. Go to https://console.cloud.google.com/\n\
         2. Create a project and enable Calendar + Gmail APIs\n\
         3. Create OAuth credentials (Desktop app)\n\
         4. Download credentials.json to {}",
        .path.display(),
        .path.parent().map(|p| p.display().to_string()).unwrap_or_default()
    )]
    Setup { path: PathBuf },

    /// 授权流程或 Token 持久化失败
    #[error("Authentication error: {0:#}")]
    Auth(anyhow::Error),

    #[error("Calendar API error: {0}")]
    Calendar(ApiError),

    #[error("Gmail API error: {0}")]
    Gmail(ApiError),

    /// 参数格式错误（如标签 JSON 数组无法解析）
    #[error("Invalid argument: {0}")]
    Input(String),

    /// 结果序列化失败
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

impl AppError {
    /// 进程退出码（所有错误统一为 1）
    pub fn exit_code(&self) -> i32 {
        1
    }
}
