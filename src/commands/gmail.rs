/// gmail 子命令
use serde_json::Value;
use std::io::Write;

use super::{GmailCommand, LabelsCommand, Output, connect};
use crate::config::Settings;
use crate::error::{ApiError, AppError};
use crate::mail::gmail::mime;
use crate::mail::gmail::types::{DraftCreated, LabelsModified, MessageDetail};
use crate::mail::gmail::{GmailApi, INBOX_LABEL, MessageFilter};

const DRAFT_NOTE: &str = "Draft saved. Open Gmail to review and send.";

/// 标签修改方向
#[derive(Debug, Clone, Copy, PartialEq)]
enum LabelChange {
    Add,
    Remove,
}

pub(super) async fn execute(
    cmd: GmailCommand,
    settings: &Settings,
    err: &mut dyn Write,
) -> Result<Output, AppError> {
    match cmd {
        GmailCommand::List { max } => {
            let api = gmail_api(settings, err).await?;
            list(&api, MessageFilter::Label(INBOX_LABEL), max).await
        }
        GmailCommand::Search { query, max } => {
            let api = gmail_api(settings, err).await?;
            list(&api, MessageFilter::Query(&query), max).await
        }
        GmailCommand::Get { message_id } => {
            let api = gmail_api(settings, err).await?;
            let message = api.get_full(&message_id).await.map_err(AppError::Gmail)?;
            let detail = MessageDetail::try_from(message).map_err(AppError::Gmail)?;
            Output::json(&detail)
        }
        GmailCommand::Draft { to, subject, body } => {
            let api = gmail_api(settings, err).await?;
            let raw = mime::encode_raw(&to, &subject, &body);
            let draft = api.create_draft(&raw).await.map_err(AppError::Gmail)?;
            Output::json(&draft_created(&draft).map_err(AppError::Gmail)?)
        }
        GmailCommand::Labels { cmd } => labels(cmd, settings, err).await,
    }
}

async fn labels(
    cmd: LabelsCommand,
    settings: &Settings,
    err: &mut dyn Write,
) -> Result<Output, AppError> {
    // 标签参数先于凭据校验，格式错误时不发起任何请求
    let (message_id, change, label_ids) = match cmd {
        LabelsCommand::List => {
            let api = gmail_api(settings, err).await?;
            let labels = api.list_labels().await.map_err(AppError::Gmail)?;
            return Output::json(&labels);
        }
        LabelsCommand::Add {
            message_id,
            label_ids,
        } => (message_id, LabelChange::Add, parse_label_ids(&label_ids)?),
        LabelsCommand::Remove {
            message_id,
            label_ids,
        } => (message_id, LabelChange::Remove, parse_label_ids(&label_ids)?),
    };

    let api = gmail_api(settings, err).await?;
    modify(&api, &message_id, change, &label_ids).await
}

async fn gmail_api(settings: &Settings, err: &mut dyn Write) -> Result<GmailApi, AppError> {
    Ok(GmailApi::new(
        connect(settings, err).await?,
        &settings.endpoints.gmail_base,
    ))
}

async fn list(api: &GmailApi, filter: MessageFilter<'_>, max: u32) -> Result<Output, AppError> {
    let summaries = api
        .list_with_metadata(filter, max)
        .await
        .map_err(AppError::Gmail)?;

    if summaries.is_empty() {
        return Ok(Output::Text("No messages found.".to_string()));
    }
    Output::json(&summaries)
}

async fn modify(
    api: &GmailApi,
    message_id: &str,
    change: LabelChange,
    label_ids: &[String],
) -> Result<Output, AppError> {
    let (add, remove, status): (&[String], &[String], _) = match change {
        LabelChange::Add => (label_ids, &[], "labels_added"),
        LabelChange::Remove => (&[], label_ids, "labels_removed"),
    };

    let result = api
        .modify_labels(message_id, add, remove)
        .await
        .map_err(AppError::Gmail)?;

    let label_ids = result
        .get("labelIds")
        .map(|ids| serde_json::from_value::<Vec<String>>(ids.clone()))
        .transpose()
        .map_err(|e| AppError::Gmail(ApiError::Decode(format!("messages.modify: {}", e))))?;

    Output::json(&LabelsModified {
        status,
        message_id: message_id.to_string(),
        label_ids,
    })
}

/// 解析 `'["Label_1", "STARRED"]'` 形式的参数
fn parse_label_ids(raw: &str) -> Result<Vec<String>, AppError> {
    serde_json::from_str(raw)
        .map_err(|e| AppError::Input(format!("label ids must be a JSON array of strings: {}", e)))
}

fn draft_created(draft: &Value) -> Result<DraftCreated, ApiError> {
    let field = |value: Option<&Value>, name: &str| {
        value
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ApiError::Decode(format!("drafts.create: missing {}", name)))
    };

    Ok(DraftCreated {
        status: "draft_created",
        id: field(draft.get("id"), "id")?,
        message_id: field(draft.pointer("/message/id"), "message.id")?,
        note: DRAFT_NOTE,
    })
}
