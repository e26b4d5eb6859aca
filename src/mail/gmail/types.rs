/// Gmail 数据结构与正文提取
use base64::{
    Engine,
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ApiError;

/// Gmail 的 base64url 数据有时带填充有时不带，解码时两者都接受
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// 列表/元数据请求需要的邮件头
pub const METADATA_HEADERS: [&str; 4] = ["From", "To", "Subject", "Date"];

/// messages.list 返回的引用
#[derive(Debug, Clone, Deserialize)]
pub struct MessageRef {
    pub id: String,

    #[serde(rename = "threadId")]
    pub thread_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageHeader {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartBody {
    #[serde(default)]
    pub data: Option<String>,
}

/// MIME 结构（payload 及其子 part）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagePart {
    #[serde(rename = "mimeType", default)]
    pub mime_type: String,

    #[serde(default)]
    pub headers: Vec<MessageHeader>,

    #[serde(default)]
    pub body: Option<PartBody>,

    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

impl MessagePart {
    /// 非空的 body.data
    fn data(&self) -> Option<&str> {
        self.body
            .as_ref()
            .and_then(|b| b.data.as_deref())
            .filter(|d| !d.is_empty())
    }
}

/// messages.get 返回的邮件
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub id: String,

    #[serde(rename = "threadId")]
    pub thread_id: String,

    #[serde(default)]
    pub snippet: String,

    #[serde(default)]
    pub payload: MessagePart,

    #[serde(rename = "labelIds", default)]
    pub label_ids: Vec<String>,
}

impl Message {
    /// 邮件头映射（同名头以最后一个为准）
    pub fn headers(&self) -> HashMap<&str, &str> {
        self.payload
            .headers
            .iter()
            .map(|h| (h.name.as_str(), h.value.as_str()))
            .collect()
    }

    /// 提取纯文本正文
    ///
    /// 顶层 body 有数据时直接解码；否则取第一个 mimeType 恰为 `text/plain` 的子 part。
    /// 没有纯文本 part 时返回空字符串，不回退到 HTML。
    pub fn plain_text_body(&self) -> Result<String, ApiError> {
        let data = match self.payload.data() {
            Some(data) => Some(data),
            None => self
                .payload
                .parts
                .iter()
                .find(|part| part.mime_type == "text/plain" && part.data().is_some())
                .and_then(MessagePart::data),
        };

        match data {
            Some(data) => decode_body(data),
            None => Ok(String::new()),
        }
    }
}

/// 解码 base64url 正文
pub fn decode_body(data: &str) -> Result<String, ApiError> {
    let bytes = URL_SAFE_LENIENT
        .decode(data.trim())
        .map_err(|e| ApiError::Decode(format!("message body is not valid base64url: {}", e)))?;

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// `gmail list` / `gmail search` 的输出条目
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageSummary {
    pub id: String,
    #[serde(rename = "threadId")]
    pub thread_id: String,
    pub snippet: String,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub date: String,
}

impl MessageSummary {
    /// id / threadId 取自列表结果，其余取自元数据
    pub fn new(reference: &MessageRef, message: &Message) -> Self {
        let headers = message.headers();
        let header = |name: &str| headers.get(name).copied().unwrap_or_default().to_string();

        Self {
            id: reference.id.clone(),
            thread_id: reference.thread_id.clone(),
            snippet: message.snippet.clone(),
            from: header("From"),
            to: header("To"),
            subject: header("Subject"),
            date: header("Date"),
        }
    }
}

/// `gmail get` 的输出
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageDetail {
    pub id: String,
    #[serde(rename = "threadId")]
    pub thread_id: String,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub date: String,
    pub body: String,
    pub labels: Vec<String>,
}

impl TryFrom<Message> for MessageDetail {
    type Error = ApiError;

    fn try_from(message: Message) -> Result<Self, Self::Error> {
        let body = message.plain_text_body()?;
        let headers = message.headers();
        let header = |name: &str| headers.get(name).copied().unwrap_or_default().to_string();

        let detail = Self {
            from: header("From"),
            to: header("To"),
            subject: header("Subject"),
            date: header("Date"),
            body,
            id: message.id.clone(),
            thread_id: message.thread_id.clone(),
            labels: message.label_ids.clone(),
        };
        Ok(detail)
    }
}

/// `gmail draft` 的输出
#[derive(Debug, Clone, Serialize)]
pub struct DraftCreated {
    pub status: &'static str,
    pub id: String,
    pub message_id: String,
    pub note: &'static str,
}

/// `gmail labels add/remove` 的输出
#[derive(Debug, Clone, Serialize)]
pub struct LabelsModified {
    pub status: &'static str,
    #[serde(rename = "messageId")]
    pub message_id: String,
    #[serde(rename = "labelIds")]
    pub label_ids: Option<Vec<String>>,
}
