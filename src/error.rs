use chrono::{DateTime, Local, NaiveDateTime};
use thiserror::Error;

/// Errors surfaced by the store, the tracker and the scheduler.
#[derive(Error, Debug)]
pub enum FokusError {
    /// A session ended before it started
    #[error("session ends ({end}) before it starts ({start})")]
    InvalidInterval {
        start: DateTime<Local>,
        end: DateTime<Local>,
    },

    /// Planned sessions must lie strictly in the future
    #[error("cannot schedule a session in the past ({0})")]
    PastTime(NaiveDateTime),

    #[error("session duration must be greater than zero")]
    InvalidDuration,

    /// Update or lookup of an unknown scheduled session
    #[error("no scheduled session with id {0}")]
    NotFound(i64),

    /// The SQLite store could not be opened, migrated or queried
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] rusqlite::Error),

    /// A stored value could not be decoded
    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("could not find home directory")]
    NoHomeDir,

    #[error("countdown already started")]
    TimerAlreadyStarted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FokusError>;
