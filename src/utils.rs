use anyhow::{anyhow, Result};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use std::time::Duration;

pub fn format_duration(seconds: i64) -> String {
    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    let mins = (seconds % 3600) / 60;
    let secs = seconds % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if mins > 0 {
        parts.push(format!("{}m", mins));
    }
    if secs > 0 || (days == 0 && hours == 0 && mins == 0) {
        parts.push(format!("{}s", secs));
    }

    parts.join(" ")
}

/// Renders fractional minutes as stored on sessions, e.g. `25.5` -> `25m 30s`.
pub fn format_minutes(minutes: f64) -> String {
    format_duration((minutes * 60.0).round() as i64)
}

/// Accepts bare minutes (`25`) or a humantime span (`25m`, `1h 30m`).
pub fn parse_span(input: &str) -> Result<Duration> {
    let input = input.trim();
    if let Ok(minutes) = input.parse::<u64>() {
        return minutes_to_duration(minutes);
    }
    humantime::parse_duration(input).map_err(|e| anyhow!("invalid duration '{input}': {e}"))
}

pub fn minutes_to_duration(minutes: u64) -> Result<Duration> {
    minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .ok_or_else(|| anyhow!("{minutes} minutes is out of range"))
}

/// Same as [`minutes_to_duration`] but for calendar arithmetic.
pub fn minutes_to_delta(minutes: u64) -> Result<TimeDelta> {
    i64::try_from(minutes)
        .ok()
        .and_then(TimeDelta::try_minutes)
        .ok_or_else(|| anyhow!("{minutes} minutes is out of range"))
}

/// Accepts `YYYY-MM-DDTHH:MM`, `YYYY-MM-DD HH:MM` or either with seconds.
pub fn parse_local_datetime(input: &str) -> Result<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input.trim(), fmt).ok())
        .ok_or_else(|| anyhow!("invalid date/time '{input}', expected YYYY-MM-DDTHH:MM"))
}

pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|e| anyhow!("invalid date '{input}': {e}"))
}
