use crate::error::{FokusError, Result};
use crate::models::{ScheduleStatus, ScheduledSession};
use crate::storage::{ScheduleFilter, Storage};
use chrono::{Duration, Local, NaiveDate, NaiveDateTime, Timelike};
use log::info;

/// Plans focus sessions for later today or future days.
pub struct Scheduler {
    storage: Storage,
}

impl Scheduler {
    pub fn new(storage: Storage) -> Result<Self> {
        storage.initialize()?;
        Ok(Self { storage })
    }

    /// Plans a session at local time `at`, which must be later than now.
    pub fn schedule(&self, at: NaiveDateTime, duration_minutes: u32, notes: &str) -> Result<i64> {
        self.schedule_relative_to(Local::now().naive_local(), at, duration_minutes, notes)
    }

    fn schedule_relative_to(
        &self,
        now: NaiveDateTime,
        at: NaiveDateTime,
        duration_minutes: u32,
        notes: &str,
    ) -> Result<i64> {
        if at <= now {
            return Err(FokusError::PastTime(at));
        }
        if duration_minutes == 0 {
            return Err(FokusError::InvalidDuration);
        }
        let planned = self.storage.add_scheduled(at, duration_minutes, notes)?;
        info!(
            "Scheduled session {} at {} for {} min",
            planned.id, planned.scheduled_at, planned.duration_minutes
        );
        Ok(planned.id)
    }

    /// Pending sessions on `date`, earliest first.
    pub fn for_date(&self, date: NaiveDate) -> Result<Vec<ScheduledSession>> {
        let from = date.and_time(chrono::NaiveTime::MIN);
        self.storage.list_scheduled(ScheduleFilter {
            from: Some(from),
            until: Some(from + Duration::days(1)),
            status: Some(ScheduleStatus::Pending),
        })
    }

    /// Pending sessions at or after `now`, earliest first.
    pub fn upcoming_pending(&self, now: NaiveDateTime) -> Result<Vec<ScheduledSession>> {
        self.storage.list_scheduled(ScheduleFilter {
            from: Some(ceil_to_second(now)),
            until: None,
            status: Some(ScheduleStatus::Pending),
        })
    }

    /// Removes a planned session. Returns `false` if the id is unknown.
    pub fn cancel(&self, id: i64) -> Result<bool> {
        let removed = self.storage.delete_scheduled(id)?;
        if removed {
            info!("Cancelled scheduled session {id}");
        }
        Ok(removed)
    }

    pub fn get(&self, id: i64) -> Result<ScheduledSession> {
        self.storage.get_scheduled(id)?.ok_or(FokusError::NotFound(id))
    }

    pub fn set_status(&self, id: i64, status: ScheduleStatus) -> Result<()> {
        self.storage.update_status(id, status)
    }

    /// Pending sessions starting within `lead` of `now` that have not been
    /// announced yet.
    pub fn due_reminders(
        &self,
        now: NaiveDateTime,
        lead: Duration,
    ) -> Result<Vec<ScheduledSession>> {
        let due = self.storage.list_scheduled(ScheduleFilter {
            from: Some(now),
            until: lead
                .checked_add(&Duration::seconds(1))
                .and_then(|span| now.checked_add_signed(span)),
            status: Some(ScheduleStatus::Pending),
        })?;
        Ok(due.into_iter().filter(|s| !s.notification_sent).collect())
    }

    pub fn mark_notified(&self, id: i64) -> Result<()> {
        self.storage.update_notification_sent(id, true)
    }

    /// Marks pending sessions whose planned window closed before `now` as
    /// missed and returns how many were changed.
    pub fn sweep_missed(&self, now: NaiveDateTime) -> Result<usize> {
        let stale = self.storage.list_scheduled(ScheduleFilter {
            from: None,
            until: Some(now),
            status: Some(ScheduleStatus::Pending),
        })?;

        let mut swept = 0;
        for planned in stale.iter().filter(|s| s.ends_at() < now) {
            self.storage.update_status(planned.id, ScheduleStatus::Missed)?;
            swept += 1;
        }
        if swept > 0 {
            info!("Marked {swept} scheduled session(s) as missed");
        }
        Ok(swept)
    }
}

/// Stored times have whole seconds, so a lower bound inside a second must
/// move up to the next one.
fn ceil_to_second(at: NaiveDateTime) -> NaiveDateTime {
    match at.with_nanosecond(0) {
        Some(whole) if whole != at => whole + Duration::seconds(1),
        _ => at,
    }
}
