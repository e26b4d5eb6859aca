/// Google Calendar 模块
pub mod api;
pub mod types;

pub use api::CalendarApi;
