/// Google Calendar 数据结构
use serde::{Deserialize, Serialize};

/// 事件开始/结束时间（定时事件用 dateTime，全天事件用 date）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventTime {
    #[serde(rename = "dateTime", default)]
    pub date_time: Option<String>,

    #[serde(default)]
    pub date: Option<String>,
}

impl EventTime {
    /// 优先 dateTime，回退到 date
    pub fn display(&self) -> Option<String> {
        self.date_time.clone().or_else(|| self.date.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Attendee {
    #[serde(default)]
    pub email: Option<String>,
}

/// events.list / events.insert 返回的事件（只取用到的字段）
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: String,

    #[serde(default)]
    pub summary: Option<String>,

    #[serde(default)]
    pub start: EventTime,

    #[serde(default)]
    pub end: EventTime,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub attendees: Vec<Attendee>,

    #[serde(rename = "htmlLink", default)]
    pub html_link: Option<String>,
}

/// `calendar list` 的输出条目
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventSummary {
    pub id: String,
    pub summary: String,
    pub start: Option<String>,
    pub end: Option<String>,
    pub location: String,
    pub attendees: Vec<Option<String>>,
}

impl From<Event> for EventSummary {
    fn from(event: Event) -> Self {
        Self {
            summary: event.summary.unwrap_or_else(|| "No title".to_string()),
            start: event.start.display(),
            end: event.end.display(),
            location: event.location.unwrap_or_default(),
            attendees: event.attendees.into_iter().map(|a| a.email).collect(),
            id: event.id,
        }
    }
}

/// `calendar create` 的输出
#[derive(Debug, Clone, Serialize)]
pub struct CreatedEvent {
    pub status: &'static str,
    pub id: String,
    pub summary: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    #[serde(rename = "htmlLink")]
    pub html_link: Option<String>,
}

impl From<Event> for CreatedEvent {
    fn from(event: Event) -> Self {
        Self {
            status: "created",
            id: event.id,
            summary: event.summary,
            start: event.start.date_time,
            end: event.end.date_time,
            html_link: event.html_link,
        }
    }
}

/// `calendar delete` 的输出
#[derive(Debug, Clone, Serialize)]
pub struct DeletedEvent {
    pub status: &'static str,
    pub id: String,
}
