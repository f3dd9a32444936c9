use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Local};

use crate::error::Result;
use crate::models::Session;
use crate::timer::Countdown;
use crate::tracker::Tracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerEvent {
    Tick { minutes: u64, seconds: u64 },
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Stopped,
}

/// A running focus session: the countdown plus what the screen needs to
/// show about it.
pub struct FocusSession {
    pub started_at: DateTime<Local>,
    pub planned: StdDuration,
    pub minutes_left: u64,
    pub seconds_left: u64,
    outcome: Option<Outcome>,
    countdown: Countdown,
    events: Receiver<TimerEvent>,
}

impl FocusSession {
    pub fn begin(planned: StdDuration) -> Result<Self> {
        Self::begin_with_tick(planned, StdDuration::from_secs(1))
    }

    pub fn begin_with_tick(planned: StdDuration, tick: StdDuration) -> Result<Self> {
        let (tx, events) = mpsc::channel();
        let tick_tx = tx.clone();

        let mut countdown = Countdown::new(
            planned,
            Box::new(move |minutes, seconds| {
                let _ = tick_tx.send(TimerEvent::Tick { minutes, seconds });
            }),
            Box::new(move || {
                let _ = tx.send(TimerEvent::Complete);
            }),
        )
        .with_tick_interval(tick);
        countdown.start()?;

        let total = planned.as_secs();
        Ok(Self {
            started_at: Local::now(),
            planned,
            minutes_left: total / 60,
            seconds_left: total % 60,
            outcome: None,
            countdown,
            events,
        })
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn is_running(&self) -> bool {
        self.outcome.is_none() && self.countdown.is_running()
    }

    /// Applies every pending timer event without blocking.
    pub fn poll(&mut self) -> Option<Outcome> {
        while let Ok(event) = self.events.try_recv() {
            self.apply(event);
        }
        self.outcome
    }

    /// Blocks for at most `timeout` waiting for the next timer event.
    pub fn wait(&mut self, timeout: StdDuration) -> Option<Outcome> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => self.apply(event),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                if self.outcome.is_none() {
                    self.outcome = Some(Outcome::Stopped);
                }
            }
        }
        self.outcome
    }

    fn apply(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::Tick { minutes, seconds } => {
                self.minutes_left = minutes;
                self.seconds_left = seconds;
            }
            TimerEvent::Complete => {
                self.minutes_left = 0;
                self.seconds_left = 0;
                self.outcome = Some(Outcome::Completed);
            }
        }
    }

    /// Stops the countdown early. A no-op once the session has completed.
    pub fn stop(&mut self) {
        self.poll();
        if self.outcome.is_none() {
            self.countdown.stop();
            self.outcome = Some(Outcome::Stopped);
        }
    }

    /// Ends the session and hands it to the tracker. Returns `None` when the
    /// session was too short to count.
    pub fn finish(mut self, tracker: &Tracker) -> Result<(Outcome, Option<Session>)> {
        self.stop();
        self.countdown.join();
        let outcome = self.outcome.unwrap_or(Outcome::Stopped);
        let recorded = tracker.record_completed_session(self.started_at, Local::now())?;
        Ok((outcome, recorded))
    }

    /// Hands the session to `front_end` until it returns, then finishes it.
    /// Time already spent is recorded even when the front end fails.
    pub fn run_then_finish<F>(
        mut self,
        tracker: &Tracker,
        front_end: F,
    ) -> anyhow::Result<(Outcome, Option<Session>)>
    where
        F: FnOnce(&mut FocusSession) -> anyhow::Result<()>,
    {
        let shown = front_end(&mut self);
        let finished = self.finish(tracker)?;
        shown?;
        Ok(finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Storage;
    use tempfile::tempdir;

    #[test]
    fn test_session_runs_to_completion() -> Result<()> {
        let mut session =
            FocusSession::begin_with_tick(StdDuration::from_secs(2), StdDuration::from_millis(5))?;
        assert_eq!((session.minutes_left, session.seconds_left), (0, 2));

        let mut outcome = None;
        for _ in 0..200 {
            outcome = session.wait(StdDuration::from_millis(50));
            if outcome.is_some() {
                break;
            }
        }
        assert_eq!(outcome, Some(Outcome::Completed));
        assert_eq!((session.minutes_left, session.seconds_left), (0, 0));
        Ok(())
    }

    #[test]
    fn test_stopped_short_session_is_not_recorded() -> Result<()> {
        let dir = tempdir()?;
        let tracker = Tracker::new(Storage::from_path(dir.path().join("fokus.db")), 60)?;

        let mut session = FocusSession::begin(StdDuration::from_secs(25 * 60))?;
        session.stop();
        assert_eq!(session.outcome(), Some(Outcome::Stopped));

        let (outcome, recorded) = session.finish(&tracker)?;
        assert_eq!(outcome, Outcome::Stopped);
        assert!(recorded.is_none());
        assert!(tracker.history_summary()?.sessions.is_empty());
        Ok(())
    }

    #[test]
    fn test_front_end_failure_still_records() -> Result<()> {
        let dir = tempdir()?;
        let tracker = Tracker::new(Storage::from_path(dir.path().join("fokus.db")), 0)?;

        let session = FocusSession::begin(StdDuration::from_secs(25 * 60))?;
        let result = session.run_then_finish(&tracker, |_| anyhow::bail!("terminal went away"));

        assert!(result.is_err());
        assert_eq!(tracker.history_summary()?.sessions.len(), 1);
        Ok(())
    }

    #[test]
    fn test_finished_session_is_recorded_with_low_threshold() -> Result<()> {
        let dir = tempdir()?;
        let tracker = Tracker::new(Storage::from_path(dir.path().join("fokus.db")), 0)?;

        let session =
            FocusSession::begin_with_tick(StdDuration::from_secs(1), StdDuration::from_millis(5))?;
        let (_, recorded) = session.finish(&tracker)?;

        assert!(recorded.is_some());
        assert_eq!(tracker.history_summary()?.sessions.len(), 1);
        Ok(())
    }
}
