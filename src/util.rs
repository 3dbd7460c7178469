use chrono::{DateTime, FixedOffset, Offset, Utc};

pub const JST_OFFSET_SECS: i32 = 9 * 3600;
pub const LOG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn jst() -> FixedOffset {
    FixedOffset::east_opt(JST_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

pub fn jst_now() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&jst())
}

pub fn format_log_time(time: &DateTime<FixedOffset>) -> String {
    time.format(LOG_TIME_FORMAT).to_string()
}
