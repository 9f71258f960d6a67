use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::db::{fmt_ts, row_to_user, USER_COLUMNS};
use crate::error::Result;
use crate::store::Store;
use crate::types::User;

impl Store {
    pub fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?1");
        Ok(conn.query_row(&sql, [id], row_to_user).optional()?)
    }

    /// Users who opted into the global daily reminder.
    pub fn users_with_daily_reminder(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users u
             WHERE u.daily_reminder_enabled = 1 AND u.daily_reminder_time IS NOT NULL
             ORDER BY u.id"
        );
        let mut stmt = conn.prepare(&sql)?;
        let users = stmt
            .query_map([], row_to_user)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    pub fn insert_user(&self, display_name: &str, timezone: &str) -> Result<User> {
        let user = User {
            id: Uuid::now_v7().to_string(),
            display_name: display_name.to_string(),
            timezone: timezone.to_string(),
            daily_reminder_time: None,
            daily_reminder_enabled: false,
            created_at: Utc::now(),
        };
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO users (id, display_name, timezone, daily_reminder_enabled, created_at)
             VALUES (?1, ?2, ?3, 0, ?4)",
            params![user.id, user.display_name, user.timezone, fmt_ts(user.created_at)],
        )?;
        Ok(user)
    }

    pub fn set_daily_reminder(&self, user_id: &str, time: Option<&str>, enabled: bool) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE users SET daily_reminder_time = ?1, daily_reminder_enabled = ?2 WHERE id = ?3",
            params![time, enabled as i32, user_id],
        )?;
        Ok(())
    }

    pub fn set_user_timezone(&self, user_id: &str, timezone: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE users SET timezone = ?1 WHERE id = ?2",
            params![timezone, user_id],
        )?;
        Ok(())
    }
}
