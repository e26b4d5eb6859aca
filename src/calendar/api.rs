/// Google Calendar API v3 调用模块
///
/// 所有操作都针对主日历（primary）
use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use crate::calendar::types::Event;
use crate::error::ApiError;
use crate::utils::http_client::{ApiClient, endpoint};

/// 主日历 ID
const PRIMARY_CALENDAR: &str = "primary";

/// events.list 单页上限
const MAX_EVENTS: usize = 50;

/// Calendar API 客户端
pub struct CalendarApi {
    client: ApiClient,
    base: String,
}

impl CalendarApi {
    /// # Arguments
    /// * `base` - API 根地址，如 `https://www.googleapis.com/calendar/v3`
    pub fn new(client: ApiClient, base: &str) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// `calendars/primary/events[/{id}]`
    fn events_url(&self, event_id: Option<&str>) -> Result<String, ApiError> {
        let mut segments = vec!["calendars", PRIMARY_CALENDAR, "events"];
        segments.extend(event_id);
        endpoint(&self.base, &segments)
    }

    /// 列出时间窗口内的事件
    ///
    /// 展开重复事件，按开始时间排序，最多返回 50 条（不翻页）
    pub async fn list_events(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<Event>, ApiError> {
        tracing::info!("📅 列出事件: {} ~ {}", time_min, time_max);

        let query = [
            ("timeMin", rfc3339(time_min)),
            ("timeMax", rfc3339(time_max)),
            ("maxResults", MAX_EVENTS.to_string()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ];

        let response = self.client.get(&self.events_url(None)?, &query).await?;
        let items = response.get("items").cloned().unwrap_or_else(|| json!([]));

        let events: Vec<Event> = serde_json::from_value(items)
            .map_err(|e| ApiError::Decode(format!("events.list: {}", e)))?;

        tracing::debug!("获取到 {} 个事件", events.len());
        Ok(events)
    }

    /// 获取单个事件（原样返回）
    pub async fn get_event(&self, event_id: &str) -> Result<Value, ApiError> {
        tracing::info!("获取事件: {}", event_id);

        let url = self.events_url(Some(event_id))?;
        self.client.get(&url, &[]).await
    }

    /// 在主日历创建定时事件
    pub async fn create_event(
        &self,
        summary: &str,
        start: &str,
        end: &str,
        description: &str,
        timezone: &str,
    ) -> Result<Event, ApiError> {
        tracing::info!("创建事件: {}", summary);

        let body = json!({
            "summary": summary,
            "description": description,
            "start": { "dateTime": start, "timeZone": timezone },
            "end": { "dateTime": end, "timeZone": timezone },
        });

        let response = self.client.post(&self.events_url(None)?, &body).await?;

        serde_json::from_value(response).map_err(|e| ApiError::Decode(format!("events.insert: {}", e)))
    }

    /// 删除事件
    pub async fn delete_event(&self, event_id: &str) -> Result<(), ApiError> {
        tracing::info!("删除事件: {}", event_id);

        let url = self.events_url(Some(event_id))?;
        self.client.delete(&url).await?;
        Ok(())
    }
}

/// RFC 3339 UTC 时间（`Z` 结尾）
fn rfc3339(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}
