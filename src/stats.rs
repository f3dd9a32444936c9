use crate::models::Session;
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeMap;

#[derive(Default, Clone, Debug)]
pub struct DayStats {
    pub total_focus: Duration,
    pub sessions: u32,
}

#[derive(Default, Clone, Debug)]
pub struct SummaryStats {
    pub total_focus: Duration,
    pub count: u32,
    pub max_focus: Option<Duration>,
    pub min_focus: Option<Duration>,
}

impl SummaryStats {
    pub fn average(&self) -> Duration {
        if self.count > 0 {
            self.total_focus / (self.count as i32)
        } else {
            Duration::zero()
        }
    }
}

pub struct Stats {
    pub daily_stats: BTreeMap<NaiveDate, DayStats>,
    pub today_summary: SummaryStats,
    pub week_summary: SummaryStats,
    pub today: NaiveDate,
    pub week_start: NaiveDate,
}

fn session_length(session: &Session) -> Duration {
    session.end - session.start
}

pub fn calculate_summary<'a>(sessions: impl IntoIterator<Item = &'a Session>) -> SummaryStats {
    let mut summary = SummaryStats::default();

    for session in sessions {
        let duration = session_length(session);
        if duration < Duration::zero() {
            continue;
        }
        summary.total_focus += duration;
        summary.count += 1;
        summary.max_focus = Some(summary.max_focus.map_or(duration, |m| m.max(duration)));
        summary.min_focus = Some(summary.min_focus.map_or(duration, |m| m.min(duration)));
    }

    summary
}

/// Per-day totals plus today's and this week's (Monday first) summaries.
pub fn calculate_stats(sessions: &[Session], today: NaiveDate) -> Stats {
    let days_from_monday = today.weekday().num_days_from_monday();
    let week_start = today - Duration::days(days_from_monday as i64);
    let week_end = week_start + Duration::days(6);

    let mut daily_stats: BTreeMap<NaiveDate, DayStats> = BTreeMap::new();
    for session in sessions {
        let stats = daily_stats.entry(session.date()).or_default();
        stats.total_focus += session_length(session);
        stats.sessions += 1;
    }

    Stats {
        today_summary: calculate_summary(sessions.iter().filter(|s| s.date() == today)),
        week_summary: calculate_summary(
            sessions
                .iter()
                .filter(|s| s.date() >= week_start && s.date() <= week_end),
        ),
        daily_stats,
        today,
        week_start,
    }
}

/// Focus totals for a single day, `None` when nothing was recorded on it.
pub fn focus_on_date(sessions: &[Session], date: NaiveDate) -> Option<DayStats> {
    calculate_stats(sessions, date).daily_stats.remove(&date)
}

/// One flag per day for the `weeks` weeks ending with the current one,
/// oldest first, each row starting on Monday.
pub fn focus_calendar(dates: &[NaiveDate], today: NaiveDate, weeks: u32) -> Vec<Vec<(NaiveDate, bool)>> {
    let this_monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
    let first_monday = this_monday - Duration::weeks(i64::from(weeks.saturating_sub(1)));

    (0..weeks)
        .map(|w| {
            (0..7)
                .map(|d| {
                    let day = first_monday + Duration::days(i64::from(w * 7 + d));
                    (day, dates.binary_search(&day).is_ok())
                })
                .collect()
        })
        .collect()
}
