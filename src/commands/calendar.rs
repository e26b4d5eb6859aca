/// calendar 子命令
use chrono::{DateTime, Duration, Utc};
use std::io::Write;

use super::{CalendarCommand, Output, connect};
use crate::calendar::CalendarApi;
use crate::calendar::types::{CreatedEvent, DeletedEvent, EventSummary};
use crate::config::Settings;
use crate::error::AppError;

pub(super) async fn execute(
    cmd: CalendarCommand,
    settings: &Settings,
    err: &mut dyn Write,
) -> Result<Output, AppError> {
    let api = CalendarApi::new(connect(settings, err).await?, &settings.endpoints.calendar_base);

    match cmd {
        CalendarCommand::List { days } => {
            let (time_min, time_max) = time_window(Utc::now(), days);
            let events = api
                .list_events(time_min, time_max)
                .await
                .map_err(AppError::Calendar)?;

            if events.is_empty() {
                return Ok(Output::Text("No upcoming events found.".to_string()));
            }

            let summaries: Vec<EventSummary> = events.into_iter().map(EventSummary::from).collect();
            Output::json(&summaries)
        }
        CalendarCommand::Get { event_id } => {
            let event = api.get_event(&event_id).await.map_err(AppError::Calendar)?;
            Output::json(&event)
        }
        CalendarCommand::Create {
            summary,
            start,
            end,
            description,
        } => {
            let event = api
                .create_event(&summary, &start, &end, &description, &settings.timezone)
                .await
                .map_err(AppError::Calendar)?;
            Output::json(&CreatedEvent::from(event))
        }
        CalendarCommand::Delete { event_id } => {
            api.delete_event(&event_id).await.map_err(AppError::Calendar)?;
            Output::json(&DeletedEvent {
                status: "deleted",
                id: event_id,
            })
        }
    }
}

/// 查询窗口 [now, now + days]
///
/// days 为 0 时窗口收缩为 1 秒，只返回与当前时刻相交的事件（API 不接受空窗口）
fn time_window(now: DateTime<Utc>, days: u32) -> (DateTime<Utc>, DateTime<Utc>) {
    let span = Duration::days(i64::from(days)).max(Duration::seconds(1));
    (now, now + span)
}
