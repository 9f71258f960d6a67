use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use vow_core::{SessionStatus, WillMode, WillStatus};

use crate::db::fmt_ts;
use crate::types::WillStamp;

/// Predicate used to pick candidate wills for a tick.
///
/// Every set field narrows the result (AND). Built with the chained
/// methods below, then rendered to a WHERE clause by [`WillFilter::to_sql`].
#[derive(Debug, Clone, Default)]
pub struct WillFilter {
    statuses: Vec<WillStatus>,
    mode: Option<WillMode>,
    session_status: Option<SessionStatus>,
    start_at_lte: Option<DateTime<Utc>>,
    end_at_lte: Option<DateTime<Utc>>,
    midpoint_at_lte: Option<DateTime<Utc>>,
    created_at_lte: Option<DateTime<Utc>>,
    review_started_lte: Option<DateTime<Utc>>,
    session_scheduled_before: Option<DateTime<Utc>>,
    session_scheduled_from: Option<DateTime<Utc>>,
    session_opened_before: Option<DateTime<Utc>>,
    unstamped: Vec<WillStamp>,
    ready_to_complete: bool,
    after_id: Option<String>,
}

impl WillFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statuses(mut self, statuses: &[WillStatus]) -> Self {
        self.statuses = statuses.to_vec();
        self
    }

    pub fn status(self, status: WillStatus) -> Self {
        self.statuses(&[status])
    }

    pub fn mode(mut self, mode: WillMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn session_status(mut self, status: SessionStatus) -> Self {
        self.session_status = Some(status);
        self
    }

    pub fn started_by(mut self, t: DateTime<Utc>) -> Self {
        self.start_at_lte = Some(t);
        self
    }

    pub fn ended_by(mut self, t: DateTime<Utc>) -> Self {
        self.end_at_lte = Some(t);
        self
    }

    pub fn midpoint_by(mut self, t: DateTime<Utc>) -> Self {
        self.midpoint_at_lte = Some(t);
        self
    }

    pub fn created_by(mut self, t: DateTime<Utc>) -> Self {
        self.created_at_lte = Some(t);
        self
    }

    /// In review since at least `t`. Rows without a review stamp fall back to `end_at`.
    pub fn in_review_since(mut self, t: DateTime<Utc>) -> Self {
        self.review_started_lte = Some(t);
        self
    }

    /// `from <= session_scheduled_at < before`; either bound may be used alone.
    pub fn session_scheduled_between(
        mut self,
        from: Option<DateTime<Utc>>,
        before: Option<DateTime<Utc>>,
    ) -> Self {
        self.session_scheduled_from = from;
        self.session_scheduled_before = before;
        self
    }

    pub fn session_opened_before(mut self, t: DateTime<Utc>) -> Self {
        self.session_opened_before = Some(t);
        self
    }

    pub fn unstamped(mut self, stamp: WillStamp) -> Self {
        self.unstamped.push(stamp);
        self
    }

    /// Every participant has reviewed and no session is pending or open.
    /// Mirrors the completion gate, so wills still waiting on a reviewer
    /// never crowd a capped batch.
    pub fn ready_to_complete(mut self) -> Self {
        self.ready_to_complete = true;
        self
    }

    /// Only ids strictly after `id`; the keyset cursor for paged scans.
    pub fn after_id(mut self, id: &str) -> Self {
        self.after_id = Some(id.to_string());
        self
    }

    /// Render as `(where_clause, params)`. The clause is `1=1` when empty.
    pub(crate) fn to_sql(&self) -> (String, Vec<Value>) {
        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        let mut bind = |clause: &str, value: String, clauses: &mut Vec<String>| {
            params.push(Value::Text(value));
            clauses.push(clause.replace('?', &format!("?{}", params.len())));
        };

        if !self.statuses.is_empty() {
            let mut placeholders = Vec::new();
            for s in &self.statuses {
                bind("?", s.as_str().to_string(), &mut placeholders);
            }
            clauses.push(format!("w.status IN ({})", placeholders.join(", ")));
        }
        if let Some(m) = self.mode {
            bind("w.mode = ?", m.as_str().to_string(), &mut clauses);
        }
        if let Some(s) = self.session_status {
            bind("w.session_status = ?", s.as_str().to_string(), &mut clauses);
        }
        if let Some(t) = self.start_at_lte {
            bind("w.start_at <= ?", fmt_ts(t), &mut clauses);
        }
        if let Some(t) = self.end_at_lte {
            bind("(w.end_at IS NOT NULL AND w.end_at <= ?)", fmt_ts(t), &mut clauses);
        }
        if let Some(t) = self.midpoint_at_lte {
            bind("(w.midpoint_at IS NOT NULL AND w.midpoint_at <= ?)", fmt_ts(t), &mut clauses);
        }
        if let Some(t) = self.created_at_lte {
            bind("w.created_at <= ?", fmt_ts(t), &mut clauses);
        }
        if let Some(t) = self.review_started_lte {
            bind(
                "COALESCE(w.review_started_at, w.end_at) <= ?",
                fmt_ts(t),
                &mut clauses,
            );
        }
        if let Some(t) = self.session_scheduled_from {
            bind("w.session_scheduled_at >= ?", fmt_ts(t), &mut clauses);
        }
        if let Some(t) = self.session_scheduled_before {
            bind("w.session_scheduled_at < ?", fmt_ts(t), &mut clauses);
        }
        if let Some(t) = self.session_opened_before {
            bind("w.session_opened_at < ?", fmt_ts(t), &mut clauses);
        }
        for stamp in &self.unstamped {
            clauses.push(format!("w.{} IS NULL", stamp.column()));
        }
        if self.ready_to_complete {
            clauses.push(
                "NOT EXISTS (
                    SELECT 1 FROM commitments c
                    WHERE c.will_id = w.id
                      AND NOT EXISTS (
                          SELECT 1 FROM reviews r WHERE r.will_id = c.will_id AND r.user_id = c.user_id
                      )
                ) AND (w.session_scheduled_at IS NULL OR w.session_status = 'completed')"
                    .to_string(),
            );
        }
        if let Some(ref id) = self.after_id {
            bind("w.id > ?", id.clone(), &mut clauses);
        }

        if clauses.is_empty() {
            ("1=1".to_string(), params)
        } else {
            (clauses.join(" AND "), params)
        }
    }
}
