use time::macros::format_description;
use time::{Duration, OffsetDateTime, UtcOffset};

/// Compact remaining-time label such as `2h 5m`, `40m` or `12s`.
pub fn duration(value: Duration) -> String {
    let total = value.whole_seconds().max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m")
    } else {
        format!("{total}s")
    }
}

pub fn uptime(value: Duration) -> String {
    let total = value.whole_seconds().max(0);
    let days = total / 86_400;
    let hours = (total % 86_400) / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if days > 0 {
        format!("{days}d {hours}h {minutes}m {seconds}s")
    } else if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else {
        format!("{minutes}m {seconds}s")
    }
}

pub fn timestamp(value: OffsetDateTime) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second] UTC");
    value
        .to_offset(UtcOffset::UTC)
        .format(&format)
        .unwrap_or_else(|_| value.unix_timestamp().to_string())
}
