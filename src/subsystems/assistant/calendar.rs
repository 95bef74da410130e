//! Spoken time and date phrasing.

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};

use crate::subsystems::host::Clock;

/// `The current time is 3:04:05 PM (Asia/Kolkata)`
pub fn describe_time(clock: &dyn Clock) -> String {
    let now = clock.now();
    format!(
        "The current time is {} ({})",
        now.format("%-I:%M:%S %p"),
        clock.zone_name()
    )
}

/// `Today is Friday, October 16, 2026`
pub fn describe_date(clock: &dyn Clock) -> String {
    format!("Today is {}", long_date(&clock.now()))
}

/// Weekday phrasing; same shape as the date.
pub fn describe_day_of_week(clock: &dyn Clock) -> String {
    describe_date(clock)
}

/// Unix seconds plus the full UTC instant with millisecond precision.
pub fn describe_timestamp(clock: &dyn Clock) -> String {
    let now = clock.now();
    format!(
        "Current timestamp: {} (Unix)\nFull ISO: {}",
        now.timestamp(),
        now.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

fn long_date(now: &DateTime<FixedOffset>) -> String {
    now.format("%A, %B %-d, %Y").to_string()
}
