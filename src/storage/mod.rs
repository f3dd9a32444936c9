//! SQLite-backed persistence for sessions, focus dates, the streak record and
//! planned sessions.
//!
//! Every operation opens its own connection and runs the schema migrations
//! first, so a missing database file is recreated on the next call and a file
//! that is not a SQLite database is moved aside and replaced by an empty one.

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, SecondsFormat, Utc};
use log::{info, warn};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

use crate::error::{FokusError, Result};
use crate::models::{Session, SessionHistory, StreakState};

mod migrations;
mod scheduled;

pub use scheduled::ScheduleFilter;

#[derive(Clone, Debug)]
pub struct Storage {
    path: PathBuf,
}

impl Storage {
    pub fn get_base_dir() -> Result<PathBuf> {
        let mut path = dirs::home_dir().ok_or(FokusError::NoHomeDir)?;
        path.push(".fokus");
        if !path.exists() {
            fs::create_dir_all(&path)?;
        }
        Ok(path)
    }

    pub fn new() -> Result<Self> {
        let path = Self::get_base_dir()?;
        Ok(Self::from_path(path.join("fokus.db")))
    }

    pub fn from_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Creates the database, its schema and the zeroed streak record if any
    /// of them is missing. Safe to call any number of times.
    pub fn initialize(&self) -> Result<()> {
        self.connect().map(|_| ())
    }

    pub(crate) fn connect(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        match open_initialized(&self.path) {
            Err(FokusError::StorageUnavailable(err)) if is_not_a_database(&err) => {
                let mut aside = OsString::from(self.path.as_os_str());
                aside.push(".corrupt");
                let aside = PathBuf::from(aside);
                warn!(
                    "Store at {} is unreadable ({err}), moving it to {} and starting fresh",
                    self.path.display(),
                    aside.display()
                );
                fs::rename(&self.path, &aside)?;
                open_initialized(&self.path)
            }
            other => other,
        }
    }

    /// Records a finished session and marks its start date as a focus day.
    pub fn append_session(&self, start: DateTime<Local>, end: DateTime<Local>) -> Result<Session> {
        if end < start {
            return Err(FokusError::InvalidInterval { start, end });
        }
        let duration_minutes = Session::minutes_between(start, end);

        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO sessions (start_time, end_time, duration_minutes) VALUES (?1, ?2, ?3)",
            params![encode_instant(&start), encode_instant(&end), duration_minutes],
        )?;
        let id = tx.last_insert_rowid();
        tx.execute(
            "INSERT OR IGNORE INTO focus_dates (date) VALUES (?1)",
            params![start.date_naive().to_string()],
        )?;
        tx.commit()?;

        info!("Recorded session {id} ({duration_minutes} min)");

        Ok(Session {
            id,
            start,
            end,
            duration_minutes,
        })
    }

    pub fn list_sessions(&self) -> Result<SessionHistory> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, start_time, end_time, duration_minutes
             FROM sessions
             ORDER BY start_time DESC, id DESC",
        )?;

        let mut sessions = Vec::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            sessions.push(row_to_session(row)?);
        }

        let total: f64 = sessions.iter().map(|s| s.duration_minutes).sum();
        Ok(SessionHistory {
            sessions,
            total_minutes: (total * 100.0).round() / 100.0,
        })
    }

    pub fn get_streak_state(&self) -> Result<StreakState> {
        let conn = self.connect()?;
        let state = conn
            .query_row(
                "SELECT current_streak, longest_streak, last_checked_date FROM streak WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, u32>(0)?,
                        row.get::<_, u32>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()?;

        match state {
            Some((current_streak, longest_streak, last_checked)) => Ok(StreakState {
                current_streak,
                longest_streak,
                last_checked_date: last_checked
                    .map(|raw| parse_date(&raw, "last_checked_date"))
                    .transpose()?,
            }),
            None => Ok(StreakState::default()),
        }
    }

    /// Counts the run of consecutive focus days ending at `today` and stores
    /// it, raising the longest streak when the run exceeds it.
    pub fn recompute_and_persist_streak(&self, today: NaiveDate) -> Result<StreakState> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let dates: HashSet<NaiveDate> = query_focus_dates(&tx)?.into_iter().collect();
        let mut current_streak = 0;
        let mut check = Some(today);
        while let Some(day) = check {
            if !dates.contains(&day) {
                break;
            }
            current_streak += 1;
            check = day.pred_opt();
        }

        let previous_longest: u32 =
            tx.query_row("SELECT longest_streak FROM streak WHERE id = 1", [], |row| {
                row.get(0)
            })?;
        let state = StreakState {
            current_streak,
            longest_streak: previous_longest.max(current_streak),
            last_checked_date: Some(today),
        };

        tx.execute(
            "UPDATE streak
             SET current_streak = ?1,
                 longest_streak = ?2,
                 last_checked_date = ?3
             WHERE id = 1",
            params![
                state.current_streak,
                state.longest_streak,
                today.to_string()
            ],
        )?;
        tx.commit()?;

        Ok(state)
    }

    /// Dates with at least one session, oldest first.
    pub fn focus_dates(&self) -> Result<Vec<NaiveDate>> {
        let conn = self.connect()?;
        query_focus_dates(&conn)
    }

    /// Forgets every focus day. Sessions and the longest streak are kept.
    pub fn clear_focus_dates(&self) -> Result<usize> {
        let conn = self.connect()?;
        let removed = conn.execute("DELETE FROM focus_dates", [])?;
        info!("Cleared {removed} focus date(s)");
        Ok(removed)
    }
}

fn open_initialized(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(path)?;
    migrations::run_migrations(&mut conn)?;
    conn.execute(
        "INSERT OR IGNORE INTO streak (id, current_streak, longest_streak) VALUES (1, 0, 0)",
        [],
    )?;
    Ok(conn)
}

fn is_not_a_database(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::NotADatabase || e.code == ErrorCode::DatabaseCorrupt
    )
}

fn query_focus_dates(conn: &Connection) -> Result<Vec<NaiveDate>> {
    let mut stmt = conn.prepare("SELECT date FROM focus_dates ORDER BY date ASC")?;
    let mut dates = Vec::new();
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let raw: String = row.get(0)?;
        dates.push(parse_date(&raw, "focus_dates.date")?);
    }
    Ok(dates)
}

fn row_to_session(row: &Row) -> Result<Session> {
    let start: String = row.get("start_time")?;
    let end: String = row.get("end_time")?;
    Ok(Session {
        id: row.get("id")?,
        start: decode_instant(&start, "start_time")?,
        end: decode_instant(&end, "end_time")?,
        duration_minutes: row.get("duration_minutes")?,
    })
}

/// Instants are stored as UTC RFC 3339 so that text order is time order.
pub(crate) fn encode_instant(value: &DateTime<Local>) -> String {
    value
        .with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn decode_instant(value: &str, field: &str) -> Result<DateTime<Local>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Local))
        .map_err(|err| FokusError::Corrupt(format!("invalid {field} '{value}': {err}")))
}

fn parse_date(value: &str, field: &str) -> Result<NaiveDate> {
    value
        .parse::<NaiveDate>()
        .map_err(|err| FokusError::Corrupt(format!("invalid {field} '{value}': {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::fs;
    use tempfile::tempdir;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record_on(storage: &Storage, day: NaiveDate) -> Result<Session> {
        let start = Local
            .from_local_datetime(&day.and_hms_opt(10, 0, 0).unwrap())
            .unwrap();
        storage.append_session(start, start + Duration::minutes(25))
    }

    #[test]
    fn test_append_and_list_sessions() -> Result<()> {
        let dir = tempdir()?;
        let storage = Storage::from_path(dir.path().join("fokus.db"));

        let first = at(2025, 5, 19, 9);
        let second = at(2025, 5, 20, 9);
        storage.append_session(first, first + Duration::seconds(1500))?;
        let recorded = storage.append_session(second, second + Duration::seconds(100))?;
        assert_eq!(recorded.duration_minutes, 1.67);

        let history = storage.list_sessions()?;
        assert_eq!(history.sessions.len(), 2);
        assert_eq!(history.sessions[0].start, second);
        assert_eq!(history.sessions[1].start, first);
        assert_eq!(history.total_minutes, 26.67);

        Ok(())
    }

    #[test]
    fn test_append_rejects_reversed_interval() -> Result<()> {
        let dir = tempdir()?;
        let storage = Storage::from_path(dir.path().join("fokus.db"));
        let start = at(2025, 5, 19, 9);

        let err = storage
            .append_session(start, start - Duration::minutes(1))
            .unwrap_err();
        assert!(matches!(err, FokusError::InvalidInterval { .. }));
        assert!(storage.list_sessions()?.sessions.is_empty());
        assert!(storage.focus_dates()?.is_empty());

        Ok(())
    }

    #[test]
    fn test_same_day_sessions_share_one_focus_date() -> Result<()> {
        let dir = tempdir()?;
        let storage = Storage::from_path(dir.path().join("fokus.db"));

        let morning = at(2025, 5, 19, 9);
        let evening = at(2025, 5, 19, 18);
        storage.append_session(morning, morning + Duration::minutes(25))?;
        storage.append_session(evening, evening + Duration::minutes(25))?;

        assert_eq!(storage.focus_dates()?, vec![date(2025, 5, 19)]);
        Ok(())
    }

    #[test]
    fn test_initialize_is_idempotent() -> Result<()> {
        let dir = tempdir()?;
        let storage = Storage::from_path(dir.path().join("nested").join("fokus.db"));

        storage.initialize()?;
        let once = storage.get_streak_state()?;
        storage.initialize()?;
        let twice = storage.get_streak_state()?;

        assert_eq!(once, twice);
        assert_eq!(once, StreakState::default());
        Ok(())
    }

    #[test]
    fn test_missing_store_is_recreated() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("fokus.db");
        let storage = Storage::from_path(path.clone());

        record_on(&storage, date(2025, 5, 19))?;
        fs::remove_file(&path)?;

        let history = storage.list_sessions()?;
        assert!(history.sessions.is_empty());
        assert!(path.exists());
        Ok(())
    }

    #[test]
    fn test_corrupt_store_reads_as_empty() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("fokus.db");
        fs::write(&path, "this is definitely not sqlite, just some plain text padding it out")?;
        let storage = Storage::from_path(path);

        assert_eq!(storage.get_streak_state()?, StreakState::default());
        assert!(storage.list_sessions()?.sessions.is_empty());
        assert!(dir.path().join("fokus.db.corrupt").exists());
        Ok(())
    }

    #[test]
    fn test_streak_counts_consecutive_days() -> Result<()> {
        let dir = tempdir()?;
        let storage = Storage::from_path(dir.path().join("fokus.db"));
        let today = date(2025, 5, 21);

        for day in [date(2025, 5, 19), date(2025, 5, 20), today] {
            record_on(&storage, day)?;
        }

        let state = storage.recompute_and_persist_streak(today)?;
        assert_eq!(state.current_streak, 3);
        assert_eq!(state.longest_streak, 3);
        assert_eq!(state.last_checked_date, Some(today));
        assert_eq!(storage.get_streak_state()?, state);
        Ok(())
    }

    #[test]
    fn test_streak_breaks_on_gap() -> Result<()> {
        let dir = tempdir()?;
        let storage = Storage::from_path(dir.path().join("fokus.db"));
        let today = date(2025, 5, 21);

        record_on(&storage, date(2025, 5, 19))?;
        record_on(&storage, today)?;

        assert_eq!(storage.recompute_and_persist_streak(today)?.current_streak, 1);
        Ok(())
    }

    #[test]
    fn test_streak_is_zero_without_today() -> Result<()> {
        let dir = tempdir()?;
        let storage = Storage::from_path(dir.path().join("fokus.db"));

        record_on(&storage, date(2025, 5, 19))?;
        record_on(&storage, date(2025, 5, 20))?;

        let state = storage.recompute_and_persist_streak(date(2025, 5, 21))?;
        assert_eq!(state.current_streak, 0);
        assert_eq!(state.longest_streak, 0);
        Ok(())
    }

    #[test]
    fn test_longest_streak_never_decreases() -> Result<()> {
        let dir = tempdir()?;
        let storage = Storage::from_path(dir.path().join("fokus.db"));

        for d in 10..=13 {
            record_on(&storage, date(2025, 5, d))?;
        }
        let mut longest = storage.recompute_and_persist_streak(date(2025, 5, 13))?.longest_streak;
        assert_eq!(longest, 4);

        for today in [date(2025, 5, 14), date(2025, 5, 11), date(2025, 5, 20)] {
            let state = storage.recompute_and_persist_streak(today)?;
            assert!(state.longest_streak >= longest);
            longest = state.longest_streak;
        }
        assert_eq!(longest, 4);
        Ok(())
    }

    #[test]
    fn test_clear_focus_dates_keeps_sessions() -> Result<()> {
        let dir = tempdir()?;
        let storage = Storage::from_path(dir.path().join("fokus.db"));

        record_on(&storage, date(2025, 5, 19))?;
        record_on(&storage, date(2025, 5, 20))?;
        assert_eq!(storage.clear_focus_dates()?, 2);

        assert!(storage.focus_dates()?.is_empty());
        assert_eq!(storage.list_sessions()?.sessions.len(), 2);
        Ok(())
    }
}
