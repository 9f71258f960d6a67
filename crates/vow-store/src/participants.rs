//! Commitments, reviews, circle membership and the legacy acknowledgments.

use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;
use vow_core::{CheckInCadence, WillStatus};

use crate::db::{fmt_ts, row_to_commitment, COMMITMENT_COLUMNS};
use crate::error::Result;
use crate::filter::WillFilter;
use crate::store::Store;
use crate::types::{Commitment, Review, Will};

impl Store {
    /// Number of participants (one per commitment).
    pub fn count_participants(&self, will_id: &str) -> Result<u64> {
        let conn = self.conn()?;
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM commitments WHERE will_id = ?1",
            [will_id],
            |r| r.get(0),
        )?;
        Ok(n as u64)
    }

    /// Reviews submitted by current participants. A review left behind by a
    /// participant whose commitment was removed does not count.
    pub fn count_reviews(&self, will_id: &str) -> Result<u64> {
        let conn = self.conn()?;
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM reviews r
             JOIN commitments c ON c.will_id = r.will_id AND c.user_id = r.user_id
             WHERE r.will_id = ?1",
            [will_id],
            |r| r.get(0),
        )?;
        Ok(n as u64)
    }

    pub fn participant_ids(&self, will_id: &str) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT user_id FROM commitments WHERE will_id = ?1 ORDER BY created_at, user_id",
        )?;
        let ids = stmt
            .query_map([will_id], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }

    pub fn commitments_for_will(&self, will_id: &str) -> Result<Vec<Commitment>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {COMMITMENT_COLUMNS} FROM commitments c
             WHERE c.will_id = ?1 ORDER BY c.created_at, c.user_id"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([will_id], row_to_commitment)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Participants who have not yet submitted their review.
    pub fn commitments_without_review(&self, will_id: &str) -> Result<Vec<Commitment>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {COMMITMENT_COLUMNS} FROM commitments c
             WHERE c.will_id = ?1
               AND NOT EXISTS (
                   SELECT 1 FROM reviews r WHERE r.will_id = c.will_id AND r.user_id = c.user_id
               )
             ORDER BY c.created_at, c.user_id"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([will_id], row_to_commitment)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Circle members who have not made a commitment to this will yet.
    /// Always empty for solo wills.
    pub fn uncommitted_members(&self, will_id: &str) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT m.user_id FROM circle_members m
             JOIN wills w ON w.circle_id = m.circle_id
             WHERE w.id = ?1 AND w.mode = 'circle'
               AND NOT EXISTS (
                   SELECT 1 FROM commitments c WHERE c.will_id = w.id AND c.user_id = m.user_id
               )
             ORDER BY m.user_id",
        )?;
        let ids = stmt
            .query_map([will_id], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }

    /// Every `active` will paired with its commitments, read `page_size`
    /// wills at a time.
    pub fn active_participants(&self, page_size: usize) -> Result<Vec<(Will, Vec<Commitment>)>> {
        let wills = self.scan_wills(&WillFilter::new().status(WillStatus::Active), page_size)?;
        let mut out = Vec::with_capacity(wills.len());
        for will in wills {
            let commitments = self.commitments_for_will(&will.id)?;
            out.push((will, commitments));
        }
        Ok(out)
    }

    // --- writes owned by the API layer; exposed for import and tests -------

    pub fn add_circle_member(&self, circle_id: &str, user_id: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO circle_members (circle_id, user_id, joined_at)
             VALUES (?1, ?2, ?3)",
            params![circle_id, user_id, fmt_ts(Utc::now())],
        )?;
        Ok(())
    }

    pub fn insert_commitment(
        &self,
        will_id: &str,
        user_id: &str,
        what: &str,
        cadence: CheckInCadence,
        check_in_time: Option<&str>,
    ) -> Result<Commitment> {
        let commitment = Commitment {
            id: Uuid::now_v7().to_string(),
            will_id: will_id.to_string(),
            user_id: user_id.to_string(),
            what: what.to_string(),
            why: String::new(),
            cadence,
            check_in_time: check_in_time.map(String::from),
            check_in_reminder_sent_at: None,
            review_reminder_sent_at: None,
            created_at: Utc::now(),
        };
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO commitments
                (id, will_id, user_id, what, why, check_in_cadence, check_in_time, created_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
            params![
                commitment.id,
                commitment.will_id,
                commitment.user_id,
                commitment.what,
                commitment.why,
                commitment.cadence.as_str(),
                commitment.check_in_time,
                fmt_ts(commitment.created_at),
            ],
        )?;
        Ok(commitment)
    }

    /// One review per (will, user); the UNIQUE constraint rejects a second.
    pub fn insert_review(&self, will_id: &str, user_id: &str, body: &str) -> Result<Review> {
        let review = Review {
            id: Uuid::now_v7().to_string(),
            will_id: will_id.to_string(),
            user_id: user_id.to_string(),
            body: body.to_string(),
            created_at: Utc::now(),
        };
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO reviews (id, will_id, user_id, body, created_at)
             VALUES (?1,?2,?3,?4,?5)",
            params![
                review.id,
                review.will_id,
                review.user_id,
                review.body,
                fmt_ts(review.created_at)
            ],
        )?;
        Ok(review)
    }

    pub fn insert_acknowledgment(&self, will_id: &str, user_id: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO acknowledgments (will_id, user_id, created_at)
             VALUES (?1, ?2, ?3)",
            params![will_id, user_id, fmt_ts(Utc::now())],
        )?;
        Ok(())
    }

    pub fn count_acknowledgments(&self, will_id: &str) -> Result<u64> {
        let conn = self.conn()?;
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM acknowledgments WHERE will_id = ?1",
            [will_id],
            |r| r.get(0),
        )?;
        Ok(n as u64)
    }
}

#[cfg(test)]
mod tests {
    use crate::store::Store;
    use crate::types::NewWill;
    use chrono::Utc;
    use vow_core::{CheckInCadence, WillStatus};

    #[test]
    fn review_counts_only_participants() {
        let store = Store::open_in_memory().unwrap();
        let will = store
            .insert_will(NewWill::circle("u1", "c1", Utc::now(), None))
            .unwrap();
        store
            .insert_commitment(&will.id, "u1", "run", CheckInCadence::Daily, None)
            .unwrap();
        store
            .insert_commitment(&will.id, "u2", "read", CheckInCadence::OneTime, Some("08:00"))
            .unwrap();
        store.insert_review(&will.id, "u1", "done").unwrap();
        store.insert_review(&will.id, "stranger", "hi").unwrap();

        assert_eq!(store.count_participants(&will.id).unwrap(), 2);
        assert_eq!(store.count_reviews(&will.id).unwrap(), 1);
        let missing = store.commitments_without_review(&will.id).unwrap();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].user_id, "u2");
        assert_eq!(missing[0].cadence, CheckInCadence::OneTime);
    }

    #[test]
    fn second_review_is_rejected() {
        let store = Store::open_in_memory().unwrap();
        let will = store.insert_will(NewWill::solo("u1", Utc::now(), None)).unwrap();
        store.insert_review(&will.id, "u1", "first").unwrap();
        assert!(store.insert_review(&will.id, "u1", "second").is_err());
    }

    #[test]
    fn uncommitted_members_excludes_committed() {
        let store = Store::open_in_memory().unwrap();
        let will = store
            .insert_will(NewWill::circle("u1", "c1", Utc::now(), None))
            .unwrap();
        for u in ["u1", "u2", "u3"] {
            store.add_circle_member("c1", u).unwrap();
        }
        store.add_circle_member("other", "u9").unwrap();
        store
            .insert_commitment(&will.id, "u1", "run", CheckInCadence::Daily, None)
            .unwrap();
        assert_eq!(store.uncommitted_members(&will.id).unwrap(), vec!["u2", "u3"]);
    }

    #[test]
    fn active_participants_only_lists_active_wills() {
        let store = Store::open_in_memory().unwrap();
        let active = store
            .insert_will(NewWill::solo("u1", Utc::now(), None).with_status(WillStatus::Active))
            .unwrap();
        let pending = store.insert_will(NewWill::solo("u2", Utc::now(), None)).unwrap();
        store
            .insert_commitment(&active.id, "u1", "run", CheckInCadence::Daily, Some("07:30"))
            .unwrap();
        store
            .insert_commitment(&pending.id, "u2", "read", CheckInCadence::Daily, None)
            .unwrap();

        let rows = store.active_participants(1).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0.id, active.id);
        assert_eq!(rows[0].1.len(), 1);
        assert_eq!(rows[0].1[0].check_in_time.as_deref(), Some("07:30"));
    }

    #[test]
    fn acknowledgments_are_recorded_once() {
        let store = Store::open_in_memory().unwrap();
        let will = store.insert_will(NewWill::solo("u1", Utc::now(), None)).unwrap();
        store.insert_acknowledgment(&will.id, "u1").unwrap();
        store.insert_acknowledgment(&will.id, "u1").unwrap();
        assert_eq!(store.count_acknowledgments(&will.id).unwrap(), 1);
    }
}
