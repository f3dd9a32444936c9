use chrono::{Local, NaiveDateTime};
use log::info;
use rusqlite::{params, OptionalExtension, Row};

use super::{decode_instant, encode_instant, Storage};
use crate::error::{FokusError, Result};
use crate::models::{ScheduleStatus, ScheduledSession};

const SCHEDULE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Optional filters for [`Storage::list_scheduled`]. `from` is inclusive,
/// `until` exclusive.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduleFilter {
    pub from: Option<NaiveDateTime>,
    pub until: Option<NaiveDateTime>,
    pub status: Option<ScheduleStatus>,
}

fn encode_schedule_time(value: &NaiveDateTime) -> String {
    value.format(SCHEDULE_FORMAT).to_string()
}

fn parse_status(value: &str) -> Result<ScheduleStatus> {
    match value {
        "pending" => Ok(ScheduleStatus::Pending),
        "active" => Ok(ScheduleStatus::Active),
        "completed" => Ok(ScheduleStatus::Completed),
        "missed" => Ok(ScheduleStatus::Missed),
        "cancelled" => Ok(ScheduleStatus::Cancelled),
        other => Err(FokusError::Corrupt(format!(
            "unknown scheduled session status '{other}'"
        ))),
    }
}

fn row_to_scheduled(row: &Row) -> Result<ScheduledSession> {
    let scheduled_at: String = row.get("scheduled_at")?;
    let status: String = row.get("status")?;
    let created_at: String = row.get("created_at")?;

    Ok(ScheduledSession {
        id: row.get("id")?,
        scheduled_at: NaiveDateTime::parse_from_str(&scheduled_at, SCHEDULE_FORMAT).map_err(
            |err| FokusError::Corrupt(format!("invalid scheduled_at '{scheduled_at}': {err}")),
        )?,
        duration_minutes: row.get("duration_minutes")?,
        notes: row.get("notes")?,
        status: parse_status(&status)?,
        notification_sent: row.get("notification_sent")?,
        created_at: decode_instant(&created_at, "created_at")?,
    })
}

impl Storage {
    pub fn add_scheduled(
        &self,
        scheduled_at: NaiveDateTime,
        duration_minutes: u32,
        notes: &str,
    ) -> Result<ScheduledSession> {
        let created_at = Local::now();
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO scheduled_sessions (scheduled_at, duration_minutes, notes, status, notification_sent, created_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)",
            params![
                encode_schedule_time(&scheduled_at),
                duration_minutes,
                notes,
                ScheduleStatus::Pending.as_str(),
                encode_instant(&created_at),
            ],
        )?;

        Ok(ScheduledSession {
            id: conn.last_insert_rowid(),
            scheduled_at,
            duration_minutes,
            notes: notes.to_string(),
            status: ScheduleStatus::Pending,
            notification_sent: false,
            created_at,
        })
    }

    /// Planned sessions matching `filter`, earliest first.
    pub fn list_scheduled(&self, filter: ScheduleFilter) -> Result<Vec<ScheduledSession>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, scheduled_at, duration_minutes, notes, status, notification_sent, created_at
             FROM scheduled_sessions
             WHERE (?1 IS NULL OR scheduled_at >= ?1)
               AND (?2 IS NULL OR scheduled_at < ?2)
               AND (?3 IS NULL OR status = ?3)
             ORDER BY scheduled_at ASC, id ASC",
        )?;

        let mut scheduled = Vec::new();
        let mut rows = stmt.query(params![
            filter.from.as_ref().map(encode_schedule_time),
            filter.until.as_ref().map(encode_schedule_time),
            filter.status.map(|s| s.as_str()),
        ])?;
        while let Some(row) = rows.next()? {
            scheduled.push(row_to_scheduled(row)?);
        }
        Ok(scheduled)
    }

    pub fn get_scheduled(&self, id: i64) -> Result<Option<ScheduledSession>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, scheduled_at, duration_minutes, notes, status, notification_sent, created_at
             FROM scheduled_sessions
             WHERE id = ?1",
        )?;
        let raw = stmt
            .query_row(params![id], |row| Ok(row_to_scheduled(row)))
            .optional()?;
        raw.transpose()
    }

    pub fn update_status(&self, id: i64, status: ScheduleStatus) -> Result<()> {
        let conn = self.connect()?;
        let changed = conn.execute(
            "UPDATE scheduled_sessions SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        if changed == 0 {
            return Err(FokusError::NotFound(id));
        }
        info!("Scheduled session {id} is now {}", status.as_str());
        Ok(())
    }

    pub fn update_notification_sent(&self, id: i64, sent: bool) -> Result<()> {
        let conn = self.connect()?;
        let changed = conn.execute(
            "UPDATE scheduled_sessions SET notification_sent = ?1 WHERE id = ?2",
            params![sent, id],
        )?;
        if changed == 0 {
            return Err(FokusError::NotFound(id));
        }
        Ok(())
    }

    /// Returns `false` when no session has this id.
    pub fn delete_scheduled(&self, id: i64) -> Result<bool> {
        let conn = self.connect()?;
        let removed = conn.execute("DELETE FROM scheduled_sessions WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn slot(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_add_and_get_scheduled() -> Result<()> {
        let dir = tempdir()?;
        let storage = Storage::from_path(dir.path().join("fokus.db"));

        let added = storage.add_scheduled(slot(1, 9), 25, "focus")?;
        let loaded = storage.get_scheduled(added.id)?.expect("row exists");

        assert_eq!(loaded.scheduled_at, slot(1, 9));
        assert_eq!(loaded.duration_minutes, 25);
        assert_eq!(loaded.notes, "focus");
        assert_eq!(loaded.status, ScheduleStatus::Pending);
        assert!(!loaded.notification_sent);
        assert!(storage.get_scheduled(added.id + 100)?.is_none());
        Ok(())
    }

    #[test]
    fn test_list_scheduled_filters_and_orders() -> Result<()> {
        let dir = tempdir()?;
        let storage = Storage::from_path(dir.path().join("fokus.db"));

        let late = storage.add_scheduled(slot(1, 15), 25, "")?;
        let early = storage.add_scheduled(slot(1, 9), 25, "")?;
        let next_day = storage.add_scheduled(slot(2, 9), 50, "")?;
        storage.update_status(early.id, ScheduleStatus::Completed)?;

        let all: Vec<i64> = storage
            .list_scheduled(ScheduleFilter::default())?
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(all, vec![early.id, late.id, next_day.id]);

        let first_day_pending = storage.list_scheduled(ScheduleFilter {
            from: Some(slot(1, 0)),
            until: Some(slot(2, 0)),
            status: Some(ScheduleStatus::Pending),
        })?;
        assert_eq!(first_day_pending.len(), 1);
        assert_eq!(first_day_pending[0].id, late.id);
        Ok(())
    }

    #[test]
    fn test_updates_on_unknown_id_fail() -> Result<()> {
        let dir = tempdir()?;
        let storage = Storage::from_path(dir.path().join("fokus.db"));

        assert!(matches!(
            storage.update_status(42, ScheduleStatus::Missed),
            Err(FokusError::NotFound(42))
        ));
        assert!(matches!(
            storage.update_notification_sent(42, true),
            Err(FokusError::NotFound(42))
        ));
        Ok(())
    }

    #[test]
    fn test_notification_flag_and_delete() -> Result<()> {
        let dir = tempdir()?;
        let storage = Storage::from_path(dir.path().join("fokus.db"));

        let added = storage.add_scheduled(slot(3, 8), 30, "")?;
        storage.update_notification_sent(added.id, true)?;
        assert!(storage.get_scheduled(added.id)?.unwrap().notification_sent);

        assert!(storage.delete_scheduled(added.id)?);
        assert!(!storage.delete_scheduled(added.id)?);
        assert!(storage.list_scheduled(ScheduleFilter::default())?.is_empty());
        Ok(())
    }
}
