/// 命令分发
///
/// argv → (resource, verb[, sub-verb]) 的封闭枚举树，参数个数由 clap 在解析阶段校验，
/// 解析失败时不读取凭据、不发起任何网络请求。
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::ffi::OsString;
use std::io::Write;

use crate::auth::TokenManager;
use crate::config::Settings;
use crate::error::AppError;
use crate::utils::http_client::{self, ApiClient};

mod calendar;
mod gmail;

/// `calendar list` 的最大查询天数（超出时 chrono 时间加法溢出）
const MAX_DAYS: i64 = 36_500;

const AFTER_HELP: &str = "\
Examples:
  google-api auth
  google-api calendar list 14
  google-api calendar create \"Standup\" 2026-01-12T09:00:00-05:00 2026-01-12T09:15:00-05:00
  google-api gmail search \"from:alice is:unread\" 10
  google-api gmail labels add <message_id> '[\"Label_1\", \"STARRED\"]'

Files (next to the executable, or in $GOOGLE_API_HOME):
  credentials.json  OAuth client secret downloaded from Google Cloud Console
  token.json        saved credential, refreshed automatically";

/// Google Calendar and Gmail from the command line
#[derive(Debug, Parser)]
#[command(
    name = "google-api",
    version,
    arg_required_else_help = true,
    after_help = AFTER_HELP
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Authenticate and store credentials
    Auth,

    /// Google Calendar operations (primary calendar)
    #[command(arg_required_else_help = true)]
    Calendar {
        #[command(subcommand)]
        cmd: CalendarCommand,
    },

    /// Gmail operations
    #[command(arg_required_else_help = true)]
    Gmail {
        #[command(subcommand)]
        cmd: GmailCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum CalendarCommand {
    /// List upcoming events
    List {
        /// Number of days ahead to look
        #[arg(
            default_value_t = 7,
            value_parser = clap::value_parser!(u32).range(..=MAX_DAYS)
        )]
        days: u32,
    },

    /// Get event details
    Get { event_id: String },

    /// Create a timed event
    Create {
        summary: String,
        /// Start time in ISO 8601, e.g. 2026-01-12T09:00:00-05:00
        start: String,
        /// End time in ISO 8601
        end: String,
        #[arg(default_value = "")]
        description: String,
    },

    /// Delete an event
    Delete { event_id: String },
}

#[derive(Debug, Subcommand)]
pub enum GmailCommand {
    /// List recent inbox messages
    List {
        #[arg(default_value_t = 20)]
        max: u32,
    },

    /// Get a message with its plain-text body
    Get { message_id: String },

    /// Search messages with Gmail query syntax
    Search {
        query: String,
        #[arg(default_value_t = 20)]
        max: u32,
    },

    /// Create a draft (does not send)
    Draft {
        to: String,
        subject: String,
        body: String,
    },

    /// Label operations
    #[command(arg_required_else_help = true)]
    Labels {
        #[command(subcommand)]
        cmd: LabelsCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum LabelsCommand {
    /// List all labels
    List,

    /// Add labels to a message
    Add {
        message_id: String,
        /// JSON array of label ids, e.g. '["Label_1", "STARRED"]'
        label_ids: String,
    },

    /// Remove labels from a message
    Remove {
        message_id: String,
        /// JSON array of label ids
        label_ids: String,
    },
}

/// 命令输出
#[derive(Debug)]
pub enum Output {
    /// 两空格缩进的 JSON
    Json(String),

    /// 纯文本（如 "No messages found."）
    Text(String),
}

impl Output {
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, AppError> {
        Ok(Self::Json(serde_json::to_string_pretty(value)?))
    }
}

/// 解析 argv 并执行，返回进程退出码
pub async fn dispatch<I, T>(
    argv: I,
    settings: &Settings,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(argv) {
        Ok(cli) => cli,
        Err(e) => return report_usage(e, out, err),
    };

    tracing::debug!("命令: {:?}", cli.command);

    if matches!(cli.command, Command::Auth) {
        writeln!(out, "Starting authentication flow...").ok();
    }

    match execute(cli.command, settings, &mut *err).await {
        Ok(Output::Json(json)) => {
            writeln!(out, "{}", json).ok();
            0
        }
        Ok(Output::Text(text)) => {
            writeln!(out, "{}", text).ok();
            0
        }
        Err(e) => {
            tracing::debug!("命令失败: {:?}", e);
            writeln!(err, "{}", e).ok();
            e.exit_code()
        }
    }
}

/// 参数错误 / 帮助信息
///
/// `--help`、`--version` 退出码为 0，其余（缺少参数、未知命令）为 1
fn report_usage(e: clap::Error, out: &mut dyn Write, err: &mut dyn Write) -> i32 {
    use clap::error::ErrorKind;

    let rendered = e.render().to_string();
    match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            write!(out, "{}", rendered).ok();
            0
        }
        ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            write!(out, "{}", rendered).ok();
            1
        }
        _ => {
            write!(err, "{}", rendered).ok();
            1
        }
    }
}

async fn execute(
    command: Command,
    settings: &Settings,
    err: &mut dyn Write,
) -> Result<Output, AppError> {
    match command {
        Command::Auth => {
            TokenManager::new(settings).obtain(err).await?;
            Ok(Output::Text(format!(
                "Authentication successful! Token saved to {}",
                settings.token_path.display()
            )))
        }
        Command::Calendar { cmd } => calendar::execute(cmd, settings, err).await,
        Command::Gmail { cmd } => gmail::execute(cmd, settings, err).await,
    }
}

/// 获取有效凭据并构建 API 客户端
async fn connect(settings: &Settings, err: &mut dyn Write) -> Result<ApiClient, AppError> {
    let credential = TokenManager::new(settings).obtain(err).await?;
    let access_token = credential
        .access_token
        .ok_or_else(|| AppError::Auth(anyhow::anyhow!("credential has no access token")))?;

    let client =
        http_client::build_client().map_err(|e| AppError::Auth(anyhow::Error::new(e)))?;

    Ok(ApiClient::new(client, access_token))
}
