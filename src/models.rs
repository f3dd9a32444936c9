use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A completed focus interval.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Session {
    pub id: i64,
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
    pub duration_minutes: f64,
}

impl Session {
    /// Minutes between `start` and `end`, rounded to two decimals.
    pub fn minutes_between(start: DateTime<Local>, end: DateTime<Local>) -> f64 {
        let secs = (end - start).num_milliseconds() as f64 / 1000.0;
        (secs / 60.0 * 100.0).round() / 100.0
    }

    pub fn date(&self) -> NaiveDate {
        self.start.date_naive()
    }
}

#[derive(Serialize, Debug, Clone, Default)]
pub struct SessionHistory {
    /// Most recent start first.
    pub sessions: Vec<Session>,
    pub total_minutes: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreakState {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_checked_date: Option<NaiveDate>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    Pending,
    Active,
    Completed,
    Missed,
    Cancelled,
}

impl ScheduleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Pending => "pending",
            ScheduleStatus::Active => "active",
            ScheduleStatus::Completed => "completed",
            ScheduleStatus::Missed => "missed",
            ScheduleStatus::Cancelled => "cancelled",
        }
    }
}

/// A planned focus session. `scheduled_at` is local wall-clock time.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScheduledSession {
    pub id: i64,
    pub scheduled_at: NaiveDateTime,
    pub duration_minutes: u32,
    pub notes: String,
    pub status: ScheduleStatus,
    pub notification_sent: bool,
    pub created_at: DateTime<Local>,
}

impl ScheduledSession {
    pub fn ends_at(&self) -> NaiveDateTime {
        self.scheduled_at + chrono::Duration::minutes(i64::from(self.duration_minutes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_minutes_between_rounds_to_two_decimals() {
        let start = Local.with_ymd_and_hms(2025, 5, 19, 9, 0, 0).unwrap();
        assert_eq!(Session::minutes_between(start, start + Duration::minutes(25)), 25.0);
        assert_eq!(Session::minutes_between(start, start + Duration::seconds(100)), 1.67);
        assert_eq!(Session::minutes_between(start, start), 0.0);
    }

    #[test]
    fn test_scheduled_ends_at() {
        let at = NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let planned = ScheduledSession {
            id: 1,
            scheduled_at: at,
            duration_minutes: 50,
            notes: String::new(),
            status: ScheduleStatus::Pending,
            notification_sent: false,
            created_at: Local::now(),
        };
        assert_eq!(planned.ends_at(), at + Duration::minutes(50));
    }
}
