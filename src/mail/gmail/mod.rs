/// Gmail 模块 - 邮件、草稿与标签 API
pub mod api;
pub mod mime;
pub mod types;

pub use api::{GmailApi, INBOX_LABEL, MessageFilter};
