/// Gmail API 调用模块
///
/// 负责邮件列表/搜索、读取正文、创建草稿以及标签管理
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::mail::gmail::types::{METADATA_HEADERS, Message, MessageRef, MessageSummary};
use crate::utils::http_client::{ApiClient, endpoint};

/// 收件箱标签
pub const INBOX_LABEL: &str = "INBOX";

/// 邮件筛选条件
#[derive(Debug, Clone, Copy)]
pub enum MessageFilter<'a> {
    /// 按标签（`gmail list` 使用 INBOX）
    Label(&'a str),

    /// Gmail 搜索语法
    Query(&'a str),
}

/// Gmail API 客户端
pub struct GmailApi {
    client: ApiClient,
    base: String,
}

impl GmailApi {
    /// # Arguments
    /// * `base` - API 根地址，如 `https://gmail.googleapis.com/gmail/v1`
    pub fn new(client: ApiClient, base: &str) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// `users/me/...`
    fn url(&self, segments: &[&str]) -> Result<String, ApiError> {
        let mut path = vec!["users", "me"];
        path.extend_from_slice(segments);
        endpoint(&self.base, &path)
    }

    /// 列出邮件 ID（单页，最多 `max_results` 条）
    pub async fn list_messages(
        &self,
        filter: MessageFilter<'_>,
        max_results: u32,
    ) -> Result<Vec<MessageRef>, ApiError> {
        tracing::info!("📬 列出邮件: {:?} (max {})", filter, max_results);

        let mut query = vec![("maxResults", max_results.to_string())];
        match filter {
            MessageFilter::Label(label) => query.push(("labelIds", label.to_string())),
            MessageFilter::Query(q) => query.push(("q", q.to_string())),
        }

        let response = self.client.get(&self.url(&["messages"])?, &query).await?;
        let messages = response.get("messages").cloned().unwrap_or_else(|| json!([]));

        serde_json::from_value(messages)
            .map_err(|e| ApiError::Decode(format!("messages.list: {}", e)))
    }

    /// 获取邮件元数据（From/To/Subject/Date + snippet）
    pub async fn get_metadata(&self, message_id: &str) -> Result<Message, ApiError> {
        let mut query = vec![("format", "metadata".to_string())];
        query.extend(
            METADATA_HEADERS
                .iter()
                .map(|h| ("metadataHeaders", h.to_string())),
        );

        let url = self.url(&["messages", message_id])?;
        let response = self.client.get(&url, &query).await?;

        serde_json::from_value(response)
            .map_err(|e| ApiError::Decode(format!("messages.get: {}", e)))
    }

    /// 获取完整邮件
    pub async fn get_full(&self, message_id: &str) -> Result<Message, ApiError> {
        tracing::info!("获取邮件: {}", message_id);

        let url = self.url(&["messages", message_id])?;
        let response = self.client.get(&url, &[("format", "full".to_string())]).await?;

        serde_json::from_value(response)
            .map_err(|e| ApiError::Decode(format!("messages.get: {}", e)))
    }

    /// 列出邮件并逐条获取元数据
    ///
    /// 顺序请求，任何一条失败都会中止整个命令（不返回部分结果）
    pub async fn list_with_metadata(
        &self,
        filter: MessageFilter<'_>,
        max_results: u32,
    ) -> Result<Vec<MessageSummary>, ApiError> {
        let references = self.list_messages(filter, max_results).await?;

        let mut summaries = Vec::with_capacity(references.len());
        for reference in &references {
            let message = self.get_metadata(&reference.id).await?;
            summaries.push(MessageSummary::new(reference, &message));
        }

        tracing::debug!("获取到 {} 封邮件的元数据", summaries.len());
        Ok(summaries)
    }

    /// 创建草稿（不发送）
    ///
    /// # Arguments
    /// * `raw` - base64url 编码的 RFC 2822 邮件
    pub async fn create_draft(&self, raw: &str) -> Result<Value, ApiError> {
        tracing::info!("创建草稿");

        let body = json!({ "message": { "raw": raw } });
        self.client.post(&self.url(&["drafts"])?, &body).await
    }

    /// 列出所有标签（原样返回）
    pub async fn list_labels(&self) -> Result<Vec<Value>, ApiError> {
        let response = self.client.get(&self.url(&["labels"])?, &[]).await?;

        Ok(response
            .get("labels")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    /// 修改邮件标签
    pub async fn modify_labels(
        &self,
        message_id: &str,
        add_label_ids: &[String],
        remove_label_ids: &[String],
    ) -> Result<Value, ApiError> {
        tracing::info!(
            "修改邮件标签: {} (+{:?} -{:?})",
            message_id,
            add_label_ids,
            remove_label_ids
        );

        let mut body = json!({});
        if !add_label_ids.is_empty() {
            body["addLabelIds"] = json!(add_label_ids);
        }
        if !remove_label_ids.is_empty() {
            body["removeLabelIds"] = json!(remove_label_ids);
        }

        let url = self.url(&["messages", message_id, "modify"])?;
        self.client.post(&url, &body).await
    }
}
