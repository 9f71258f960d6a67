use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::{debug, info, warn};
use uuid::Uuid;
use vow_core::{SessionStatus, WillMode, WillStatus};

use crate::db::{fmt_ts, init_db, row_to_will, WILL_COLUMNS};
use crate::error::{Result, StoreError};
use crate::filter::WillFilter;
use crate::types::{NewWill, Will};

/// SQLite-backed repository for everything the scheduler reads and writes.
///
/// Cheap to clone; clones share one connection. Separate processes (or
/// separate `Store`s on the same file) coordinate only through the
/// conditional updates in `claims.rs`, never through in-process locks.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Wrap an open connection, initialising the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open (or create) a database file with the pragmas the daemon expects.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA busy_timeout=5000; PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;",
        )?;
        Self::new(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    // --- wills: reads -------------------------------------------------------

    pub fn get_will(&self, id: &str) -> Result<Option<Will>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {WILL_COLUMNS} FROM wills w WHERE w.id = ?1");
        Ok(conn.query_row(&sql, [id], row_to_will).optional()?)
    }

    /// Load wills matching `filter`, oldest-touched first, capped at `limit`.
    ///
    /// Rows that fail to decode are logged and skipped so one corrupt row
    /// cannot stall every tick.
    pub fn find_wills(&self, filter: &WillFilter, limit: Option<usize>) -> Result<Vec<Will>> {
        let (wills, _) = self.select_wills(filter, "w.updated_at, w.id", limit)?;
        Ok(wills)
    }

    /// Every will matching `filter`, read `page_size` rows at a time in id
    /// order. For passes that must reach all candidates rather than the
    /// first batch.
    pub fn scan_wills(&self, filter: &WillFilter, page_size: usize) -> Result<Vec<Will>> {
        let page_size = page_size.max(1);
        let mut out = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page_filter = match cursor {
                Some(ref id) => filter.clone().after_id(id),
                None => filter.clone(),
            };
            let (wills, last_id) = self.select_wills(&page_filter, "w.id", Some(page_size))?;
            out.extend(wills);
            match last_id {
                Some(id) => cursor = Some(id),
                None => break,
            }
        }
        Ok(out)
    }

    /// Decoded rows plus the id of the last row read, decodable or not,
    /// which is `None` once a page comes back short.
    fn select_wills(
        &self,
        filter: &WillFilter,
        order_by: &str,
        limit: Option<usize>,
    ) -> Result<(Vec<Will>, Option<String>)> {
        let (where_sql, mut values) = filter.to_sql();
        let mut sql = format!("SELECT {WILL_COLUMNS} FROM wills w WHERE {where_sql} ORDER BY {order_by}");
        if let Some(n) = limit {
            values.push(rusqlite::types::Value::Integer(n as i64));
            sql.push_str(&format!(" LIMIT ?{}", values.len()));
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Ok((row.get::<_, String>(0)?, row_to_will(row)))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let full_page = limit.is_some_and(|n| rows.len() >= n);
        let last_id = if full_page {
            rows.last().map(|(id, _)| id.clone())
        } else {
            None
        };
        let wills = rows
            .into_iter()
            .filter_map(|(id, decoded)| match decoded {
                Ok(w) => Some(w),
                Err(e) => {
                    warn!(will_id = %id, error = %e, "skipping undecodable will row");
                    None
                }
            })
            .collect();
        Ok((wills, last_id))
    }

    // --- wills: scheduler-owned writes --------------------------------------

    /// Compare-and-set the lifecycle status. Returns `false` when the row is
    /// no longer in `from` (another tick moved it first).
    ///
    /// Refuses any move that does not go strictly forward.
    pub fn update_will_status(
        &self,
        id: &str,
        from: WillStatus,
        to: WillStatus,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        if to.rank() <= from.rank() {
            return Err(StoreError::StatusRegression { from, to });
        }
        let conn = self.conn()?;
        let now_str = fmt_ts(now);
        let n = conn.execute(
            "UPDATE wills SET
                status = ?1,
                review_started_at = CASE WHEN ?1 = 'will_review'
                    THEN COALESCE(review_started_at, ?2) ELSE review_started_at END,
                updated_at = ?2
             WHERE id = ?3 AND status = ?4",
            params![to.as_str(), now_str, id, from.as_str()],
        )?;
        if n == 1 {
            info!(will_id = %id, %from, %to, "will status advanced");
        } else {
            debug!(will_id = %id, %from, %to, "status already moved by another tick");
        }
        Ok(n == 1)
    }

    /// Claim the `pending → open` session move. The winner stamps
    /// `session_opened_at`; losers get `false`.
    pub fn open_session(&self, id: &str, now: DateTime<Utc>) -> Result<bool> {
        let conn = self.conn()?;
        let now_str = fmt_ts(now);
        let n = conn.execute(
            "UPDATE wills SET session_status = 'open', session_opened_at = ?1, updated_at = ?1
             WHERE id = ?2 AND mode = 'circle' AND session_status = 'pending'",
            params![now_str, id],
        )?;
        Ok(n == 1)
    }

    /// Claim the `open → completed` session move.
    pub fn close_session(&self, id: &str, now: DateTime<Utc>) -> Result<bool> {
        let conn = self.conn()?;
        let n = conn.execute(
            "UPDATE wills SET session_status = 'completed', updated_at = ?1
             WHERE id = ?2 AND session_status = 'open'",
            params![fmt_ts(now), id],
        )?;
        Ok(n == 1)
    }

    /// Record the room URL if none is set yet.
    pub fn set_session_url(&self, id: &str, url: &str) -> Result<bool> {
        let conn = self.conn()?;
        let n = conn.execute(
            "UPDATE wills SET session_url = ?1 WHERE id = ?2 AND session_url IS NULL",
            params![url, id],
        )?;
        Ok(n == 1)
    }

    /// Fold the legacy `waiting_for_end_room` status into `will_review`.
    ///
    /// Run once at startup, before the first tick. Returns how many rows moved.
    pub fn migrate_legacy_statuses(&self, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn()?;
        let now_str = fmt_ts(now);
        let n = conn.execute(
            "UPDATE wills SET status = 'will_review',
                review_started_at = COALESCE(review_started_at, end_at, ?1),
                updated_at = ?1
             WHERE status = 'waiting_for_end_room'",
            [&now_str],
        )?;
        if n > 0 {
            warn!(count = n, "legacy waiting_for_end_room wills migrated to will_review");
        }
        Ok(n)
    }

    // --- wills: creation (API layer / tests) --------------------------------

    /// Insert a will. Circle wills with a scheduled session start with
    /// `session_status = pending`; every other will has no session.
    pub fn insert_will(&self, new: NewWill) -> Result<Will> {
        let now = Utc::now();
        let midpoint_at = new.end_at.map(|end| new.start_at + (end - new.start_at) / 2);
        let session_status = match (new.mode, new.session_scheduled_at) {
            (WillMode::Circle, Some(_)) => Some(SessionStatus::Pending),
            _ => None,
        };
        let session_scheduled_at = session_status.and(new.session_scheduled_at);
        let will = Will {
            id: Uuid::now_v7().to_string(),
            mode: new.mode,
            circle_id: new.circle_id,
            title: new.title,
            start_at: new.start_at,
            end_at: new.end_at,
            midpoint_at,
            reminder_time: new.reminder_time,
            check_in_time: new.check_in_time,
            timezone: new.timezone,
            status: new.status,
            review_started_at: None,
            session_scheduled_at,
            session_opened_at: None,
            session_status,
            session_url: None,
            started_notification_sent_at: None,
            midpoint_notification_sent_at: None,
            completion_notification_sent_at: None,
            created_by: new.created_by,
            created_at: now,
            updated_at: now,
        };

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO wills
                (id, mode, circle_id, title, start_at, end_at, midpoint_at, reminder_time,
                 check_in_time, timezone, status, session_scheduled_at, session_status,
                 created_by, created_at, updated_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?15)",
            params![
                will.id,
                will.mode.as_str(),
                will.circle_id,
                will.title,
                fmt_ts(will.start_at),
                will.end_at.map(fmt_ts),
                will.midpoint_at.map(fmt_ts),
                will.reminder_time,
                will.check_in_time,
                will.timezone,
                will.status.as_str(),
                will.session_scheduled_at.map(fmt_ts),
                will.session_status.map(|s| s.as_str()),
                will.created_by,
                fmt_ts(will.created_at),
            ],
        )?;
        Ok(will)
    }

    /// Backdate `created_at`. Used when importing wills and by tests that
    /// exercise age-based reminders.
    pub fn set_will_created_at(&self, id: &str, created_at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn()?;
        let n = conn.execute(
            "UPDATE wills SET created_at = ?1 WHERE id = ?2",
            params![fmt_ts(created_at), id],
        )?;
        if n == 0 {
            return Err(StoreError::WillNotFound(id.to_string()));
        }
        Ok(())
    }
}
