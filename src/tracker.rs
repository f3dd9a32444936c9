use crate::error::{FokusError, Result};
use crate::models::{Session, SessionHistory};
use crate::storage::Storage;
use chrono::{DateTime, Duration, Local, NaiveDate};
use log::{debug, info};

/// Turns finished focus sessions into history rows and keeps the day streak
/// up to date.
pub struct Tracker {
    pub storage: Storage,
    pub min_session: Duration,
}

impl Tracker {
    pub fn new(storage: Storage, min_session_secs: u64) -> Result<Self> {
        let min_session = i64::try_from(min_session_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or(FokusError::InvalidDuration)?;
        storage.initialize()?;
        Ok(Self {
            storage,
            min_session,
        })
    }

    /// Stores the session unless it is shorter than the configured minimum,
    /// in which case `None` is returned and nothing is written.
    pub fn record_completed_session(
        &self,
        start: DateTime<Local>,
        end: DateTime<Local>,
    ) -> Result<Option<Session>> {
        let elapsed = end - start;
        if elapsed >= Duration::zero() && elapsed < self.min_session {
            debug!(
                "Ignoring {}s session, minimum is {}s",
                elapsed.num_seconds(),
                self.min_session.num_seconds()
            );
            return Ok(None);
        }
        self.storage.append_session(start, end).map(Some)
    }

    /// Recomputes the streak for today's local date.
    pub fn refresh_streak(&self) -> Result<(u32, u32)> {
        self.refresh_streak_on(Local::now().date_naive())
    }

    pub fn refresh_streak_on(&self, today: NaiveDate) -> Result<(u32, u32)> {
        let state = self.storage.recompute_and_persist_streak(today)?;
        info!(
            "Streak refreshed: current {} day(s), longest {} day(s)",
            state.current_streak, state.longest_streak
        );
        Ok((state.current_streak, state.longest_streak))
    }

    /// Last stored streak, without recomputing it.
    pub fn streak_info(&self) -> Result<(u32, u32)> {
        let state = self.storage.get_streak_state()?;
        Ok((state.current_streak, state.longest_streak))
    }

    pub fn history_summary(&self) -> Result<SessionHistory> {
        self.storage.list_sessions()
    }
}
