//! Claim-then-act primitives.
//!
//! Each claim is a single conditional write; the caller owns the
//! obligation to send iff the write changed a row. A `false` return means
//! a concurrent tick (in this process or another) already claimed it.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, OptionalExtension};
use tracing::debug;
use vow_core::NotificationCategory;

use crate::db::{fmt_date, fmt_ts};
use crate::error::Result;
use crate::store::Store;
use crate::types::{CommitmentStamp, WillStamp};

impl Store {
    /// Stamp a one-shot column on a will if it is still NULL.
    pub fn claim_will_stamp(&self, will_id: &str, stamp: WillStamp, now: DateTime<Utc>) -> Result<bool> {
        let conn = self.conn()?;
        let col = stamp.column();
        let sql = format!("UPDATE wills SET {col} = ?1 WHERE id = ?2 AND {col} IS NULL");
        let won = conn.execute(&sql, params![fmt_ts(now), will_id])? == 1;
        if !won {
            debug!(will_id = %will_id, column = col, "stamp already claimed");
        }
        Ok(won)
    }

    /// Stamp a one-shot column on a commitment if it is still NULL.
    pub fn claim_commitment_stamp(
        &self,
        commitment_id: &str,
        stamp: CommitmentStamp,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let conn = self.conn()?;
        let col = stamp.column();
        let sql = format!("UPDATE commitments SET {col} = ?1 WHERE id = ?2 AND {col} IS NULL");
        Ok(conn.execute(&sql, params![fmt_ts(now), commitment_id])? == 1)
    }

    /// Insert the (will, user, kind) marker row; the row's existence is the dedup.
    pub fn claim_will_user_reminder(
        &self,
        will_id: &str,
        user_id: &str,
        kind: NotificationCategory,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let conn = self.conn()?;
        let n = conn.execute(
            "INSERT OR IGNORE INTO will_user_reminders (will_id, user_id, kind, sent_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![will_id, user_id, kind.as_str(), fmt_ts(now)],
        )?;
        Ok(n == 1)
    }

    pub fn has_will_user_reminder(
        &self,
        will_id: &str,
        user_id: &str,
        kind: NotificationCategory,
    ) -> Result<bool> {
        let conn = self.conn()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM will_user_reminders WHERE will_id = ?1 AND user_id = ?2 AND kind = ?3",
                params![will_id, user_id, kind.as_str()],
                |r| r.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Claim the once-per-local-day slot for `(user, category)`.
    ///
    /// `local_date` is today's date in the user's timezone. The upsert only
    /// rewrites the row when the stored date differs, so two claims for the
    /// same local day collapse to one winner regardless of elapsed hours.
    pub fn claim_daily(
        &self,
        user_id: &str,
        category: NotificationCategory,
        local_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let conn = self.conn()?;
        let n = conn.execute(
            "INSERT INTO user_notification_log (user_id, category, last_sent_at, last_local_date)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (user_id, category) DO UPDATE SET
                last_sent_at = excluded.last_sent_at,
                last_local_date = excluded.last_local_date
             WHERE user_notification_log.last_local_date <> excluded.last_local_date",
            params![user_id, category.as_str(), fmt_ts(now), fmt_date(local_date)],
        )?;
        Ok(n == 1)
    }

    /// Local date of the last daily send for `(user, category)`, if any.
    pub fn last_daily_send(
        &self,
        user_id: &str,
        category: NotificationCategory,
    ) -> Result<Option<NaiveDate>> {
        let conn = self.conn()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT last_local_date FROM user_notification_log
                 WHERE user_id = ?1 AND category = ?2",
                params![user_id, category.as_str()],
                |r| r.get(0),
            )
            .optional()?;
        match raw {
            None => Ok(None),
            Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map(Some)
                .map_err(|_| crate::error::StoreError::InvalidTimestamp {
                    column: "last_local_date",
                    value: s,
                }),
        }
    }
}
