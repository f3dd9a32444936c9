use log::debug;
use rusqlite::{Connection, Transaction};

use crate::error::{FokusError, Result};

const CURRENT_SCHEMA_VERSION: i32 = 2;

const SCHEMA_V1: &str = "
CREATE TABLE IF NOT EXISTS sessions (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    start_time       TEXT NOT NULL,
    end_time         TEXT NOT NULL,
    duration_minutes REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sessions_start_time ON sessions(start_time);

CREATE TABLE IF NOT EXISTS focus_dates (
    date TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS streak (
    id                INTEGER PRIMARY KEY CHECK (id = 1),
    current_streak    INTEGER NOT NULL DEFAULT 0,
    longest_streak    INTEGER NOT NULL DEFAULT 0,
    last_checked_date TEXT
);
";

const SCHEMA_V2: &str = "
CREATE TABLE IF NOT EXISTS scheduled_sessions (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    scheduled_at      TEXT NOT NULL,
    duration_minutes  INTEGER NOT NULL,
    notes             TEXT NOT NULL DEFAULT '',
    status            TEXT NOT NULL DEFAULT 'pending',
    notification_sent INTEGER NOT NULL DEFAULT 0,
    created_at        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_scheduled_at_status ON scheduled_sessions(scheduled_at, status);
";

pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let mut version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version > CURRENT_SCHEMA_VERSION {
        return Err(FokusError::Corrupt(format!(
            "database version ({version}) is newer than supported schema ({CURRENT_SCHEMA_VERSION})"
        )));
    }

    if version == CURRENT_SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn.transaction()?;

    while version < CURRENT_SCHEMA_VERSION {
        let next_version = version + 1;
        apply_migration(&tx, next_version)?;
        debug!("Applied schema migration v{next_version}");
        version = next_version;
    }

    tx.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)?;
    tx.commit()?;

    Ok(())
}

fn apply_migration(tx: &Transaction<'_>, version: i32) -> Result<()> {
    match version {
        1 => tx.execute_batch(SCHEMA_V1)?,
        2 => tx.execute_batch(SCHEMA_V2)?,
        _ => {
            return Err(FokusError::Corrupt(format!(
                "unknown migration target version: {version}"
            )))
        }
    }
    Ok(())
}
