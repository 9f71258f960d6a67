use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{types::Type, Connection, Result};

use crate::types::{Commitment, User, Will};

/// Render an instant the way every timestamp column stores it: RFC 3339,
/// UTC, millisecond precision, `Z` suffix. The fixed width keeps string
/// comparison in SQL equal to chronological comparison.
pub fn fmt_ts(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn fmt_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

fn conversion_error(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, msg.into())
}

pub(crate) fn ts_at(row: &rusqlite::Row<'_>, idx: usize) -> Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, format!("bad timestamp {raw:?}: {e}")))
}

pub(crate) fn opt_ts_at(row: &rusqlite::Row<'_>, idx: usize) -> Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        None => Ok(None),
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|d| Some(d.with_timezone(&Utc)))
            .map_err(|e| conversion_error(idx, format!("bad timestamp {raw:?}: {e}"))),
    }
}

fn enum_at<T: FromStr<Err = String>>(row: &rusqlite::Row<'_>, idx: usize) -> Result<T> {
    let raw: String = row.get(idx)?;
    T::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn opt_enum_at<T: FromStr<Err = String>>(row: &rusqlite::Row<'_>, idx: usize) -> Result<Option<T>> {
    match row.get::<_, Option<String>>(idx)? {
        None => Ok(None),
        Some(raw) => T::from_str(&raw).map(Some).map_err(|e| conversion_error(idx, e)),
    }
}

/// Column list matching `row_to_will`. Aliased `w` in every query.
pub(crate) const WILL_COLUMNS: &str = "w.id, w.mode, w.circle_id, w.title, w.start_at, w.end_at,
    w.midpoint_at, w.reminder_time, w.check_in_time, w.timezone, w.status,
    w.review_started_at, w.session_scheduled_at, w.session_opened_at, w.session_status,
    w.session_url, w.started_notification_sent_at, w.midpoint_notification_sent_at,
    w.completion_notification_sent_at, w.created_by, w.created_at, w.updated_at";

pub(crate) fn row_to_will(row: &rusqlite::Row<'_>) -> Result<Will> {
    Ok(Will {
        id: row.get(0)?,
        mode: enum_at(row, 1)?,
        circle_id: row.get(2)?,
        title: row.get(3)?,
        start_at: ts_at(row, 4)?,
        end_at: opt_ts_at(row, 5)?,
        midpoint_at: opt_ts_at(row, 6)?,
        reminder_time: row.get(7)?,
        check_in_time: row.get(8)?,
        timezone: row.get(9)?,
        status: enum_at(row, 10)?,
        review_started_at: opt_ts_at(row, 11)?,
        session_scheduled_at: opt_ts_at(row, 12)?,
        session_opened_at: opt_ts_at(row, 13)?,
        session_status: opt_enum_at(row, 14)?,
        session_url: row.get(15)?,
        started_notification_sent_at: opt_ts_at(row, 16)?,
        midpoint_notification_sent_at: opt_ts_at(row, 17)?,
        completion_notification_sent_at: opt_ts_at(row, 18)?,
        created_by: row.get(19)?,
        created_at: ts_at(row, 20)?,
        updated_at: ts_at(row, 21)?,
    })
}

pub(crate) const COMMITMENT_COLUMNS: &str = "c.id, c.will_id, c.user_id, c.what, c.why,
    c.check_in_cadence, c.check_in_time, c.check_in_reminder_sent_at,
    c.review_reminder_sent_at, c.created_at";

pub(crate) fn row_to_commitment(row: &rusqlite::Row<'_>) -> Result<Commitment> {
    Ok(Commitment {
        id: row.get(0)?,
        will_id: row.get(1)?,
        user_id: row.get(2)?,
        what: row.get(3)?,
        why: row.get(4)?,
        cadence: enum_at(row, 5)?,
        check_in_time: row.get(6)?,
        check_in_reminder_sent_at: opt_ts_at(row, 7)?,
        review_reminder_sent_at: opt_ts_at(row, 8)?,
        created_at: ts_at(row, 9)?,
    })
}

pub(crate) const USER_COLUMNS: &str =
    "u.id, u.display_name, u.timezone, u.daily_reminder_time, u.daily_reminder_enabled, u.created_at";

pub(crate) fn row_to_user(row: &rusqlite::Row<'_>) -> Result<User> {
    Ok(User {
        id: row.get(0)?,
        display_name: row.get(1)?,
        timezone: row.get(2)?,
        daily_reminder_time: row.get(3)?,
        daily_reminder_enabled: row.get::<_, i32>(4)? != 0,
        created_at: ts_at(row, 5)?,
    })
}

/// Initialise every table the scheduler touches. Safe to call on every
/// startup. CREATE IF NOT EXISTS means it's idempotent.
pub fn init_db(conn: &Connection) -> Result<()> {
    create_users_table(conn)?;
    create_wills_table(conn)?;
    create_participation_tables(conn)?;
    create_dedup_tables(conn)?;
    Ok(())
}

fn create_users_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id                      TEXT PRIMARY KEY NOT NULL,
            display_name            TEXT NOT NULL,
            timezone                TEXT NOT NULL DEFAULT 'UTC',
            daily_reminder_time     TEXT,               -- HH:MM local
            daily_reminder_enabled  INTEGER NOT NULL DEFAULT 0,
            created_at              TEXT NOT NULL
        );",
    )
}

fn create_wills_table(conn: &Connection) -> Result<()> {
    // Every *_sent_at column is written at most once, by a conditional
    // UPDATE ... WHERE col IS NULL. session_status is NULL for solo wills.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS wills (
            id                                TEXT PRIMARY KEY NOT NULL,
            mode                              TEXT NOT NULL,      -- circle | solo
            circle_id                         TEXT,
            title                             TEXT NOT NULL DEFAULT '',
            start_at                          TEXT NOT NULL,
            end_at                            TEXT,               -- NULL = open-ended
            midpoint_at                       TEXT,
            reminder_time                     TEXT,               -- HH:MM local
            check_in_time                     TEXT,               -- HH:MM local
            timezone                          TEXT,
            status                            TEXT NOT NULL DEFAULT 'pending',
            review_started_at                 TEXT,
            session_scheduled_at              TEXT,
            session_opened_at                 TEXT,
            session_status                    TEXT,
            session_url                       TEXT,
            started_notification_sent_at      TEXT,
            midpoint_notification_sent_at     TEXT,
            completion_notification_sent_at   TEXT,
            created_by                        TEXT NOT NULL,
            created_at                        TEXT NOT NULL,
            updated_at                        TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_wills_status ON wills (status);
        CREATE INDEX IF NOT EXISTS idx_wills_session
            ON wills (session_status, session_scheduled_at);",
    )
}

fn create_participation_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS circle_members (
            circle_id   TEXT NOT NULL,
            user_id     TEXT NOT NULL REFERENCES users(id),
            joined_at   TEXT NOT NULL,
            PRIMARY KEY (circle_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS commitments (
            id                          TEXT PRIMARY KEY NOT NULL,
            will_id                     TEXT NOT NULL REFERENCES wills(id),
            user_id                     TEXT NOT NULL REFERENCES users(id),
            what                        TEXT NOT NULL,
            why                         TEXT NOT NULL DEFAULT '',
            check_in_cadence            TEXT NOT NULL DEFAULT 'daily',
            check_in_time               TEXT,
            check_in_reminder_sent_at   TEXT,
            review_reminder_sent_at     TEXT,
            created_at                  TEXT NOT NULL,
            UNIQUE (will_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS reviews (
            id          TEXT PRIMARY KEY NOT NULL,
            will_id     TEXT NOT NULL REFERENCES wills(id),
            user_id     TEXT NOT NULL REFERENCES users(id),
            body        TEXT NOT NULL DEFAULT '',
            created_at  TEXT NOT NULL,
            UNIQUE (will_id, user_id)
        );

        -- Legacy: no longer consulted for completion.
        CREATE TABLE IF NOT EXISTS acknowledgments (
            will_id     TEXT NOT NULL REFERENCES wills(id),
            user_id     TEXT NOT NULL REFERENCES users(id),
            created_at  TEXT NOT NULL,
            PRIMARY KEY (will_id, user_id)
        );",
    )
}

fn create_dedup_tables(conn: &Connection) -> Result<()> {
    // user_notification_log: one row per (user, category); the local date
    // of the last send is what the daily claim compares against.
    // will_user_reminders: existence of a row *is* the dedup marker.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS user_notification_log (
            user_id          TEXT NOT NULL REFERENCES users(id),
            category         TEXT NOT NULL,
            last_sent_at     TEXT NOT NULL,
            last_local_date  TEXT NOT NULL,   -- YYYY-MM-DD in the user's zone
            PRIMARY KEY (user_id, category)
        );

        CREATE TABLE IF NOT EXISTS will_user_reminders (
            will_id   TEXT NOT NULL REFERENCES wills(id),
            user_id   TEXT NOT NULL REFERENCES users(id),
            kind      TEXT NOT NULL,
            sent_at   TEXT NOT NULL,
            PRIMARY KEY (will_id, user_id, kind)
        );",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn init_db_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        init_db(&conn).unwrap();
    }

    #[test]
    fn timestamps_sort_lexicographically() {
        let a = Utc.with_ymd_and_hms(2026, 9, 30, 23, 59, 59).unwrap();
        let b = Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap();
        assert!(fmt_ts(a) < fmt_ts(b));
        assert_eq!(fmt_ts(b), "2026-10-01T00:00:00.000Z");
    }
}
