use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vow_core::{CheckInCadence, SessionStatus, WillMode, WillStatus};

/// A commitment cycle. Everything after `status` is owned by the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Will {
    pub id: String,
    pub mode: WillMode,
    /// Set for circle wills only.
    pub circle_id: Option<String>,
    pub title: String,
    pub start_at: DateTime<Utc>,
    /// `None` for open-ended wills; they never reach review on their own.
    pub end_at: Option<DateTime<Utc>>,
    /// Precomputed `(start + end) / 2`.
    pub midpoint_at: Option<DateTime<Utc>>,
    /// Local `HH:MM`.
    pub reminder_time: Option<String>,
    /// Local `HH:MM`.
    pub check_in_time: Option<String>,
    /// Zone the will's local times are expressed in, if not the participant's.
    pub timezone: Option<String>,
    pub status: WillStatus,
    /// When the will entered `will_review`.
    pub review_started_at: Option<DateTime<Utc>>,
    pub session_scheduled_at: Option<DateTime<Utc>>,
    pub session_opened_at: Option<DateTime<Utc>>,
    pub session_status: Option<SessionStatus>,
    pub session_url: Option<String>,
    pub started_notification_sent_at: Option<DateTime<Utc>>,
    pub midpoint_notification_sent_at: Option<DateTime<Utc>>,
    pub completion_notification_sent_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Will {
    /// True when a session window exists and has not finished.
    pub fn has_unfinished_session(&self) -> bool {
        self.session_scheduled_at.is_some()
            && self.session_status != Some(SessionStatus::Completed)
    }

    /// Total planned length, if the will has an end.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.end_at.map(|end| end - self.start_at)
    }
}

/// Input for creating a will. Ids and derived fields are filled in by the store.
#[derive(Debug, Clone)]
pub struct NewWill {
    pub mode: WillMode,
    pub circle_id: Option<String>,
    pub title: String,
    pub start_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
    pub reminder_time: Option<String>,
    pub check_in_time: Option<String>,
    pub timezone: Option<String>,
    pub status: WillStatus,
    pub session_scheduled_at: Option<DateTime<Utc>>,
    pub created_by: String,
}

impl NewWill {
    pub fn solo(created_by: &str, start_at: DateTime<Utc>, end_at: Option<DateTime<Utc>>) -> Self {
        Self {
            mode: WillMode::Solo,
            circle_id: None,
            title: String::new(),
            start_at,
            end_at,
            reminder_time: None,
            check_in_time: None,
            timezone: None,
            status: WillStatus::Pending,
            session_scheduled_at: None,
            created_by: created_by.to_string(),
        }
    }

    pub fn circle(
        created_by: &str,
        circle_id: &str,
        start_at: DateTime<Utc>,
        end_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            mode: WillMode::Circle,
            circle_id: Some(circle_id.to_string()),
            ..Self::solo(created_by, start_at, end_at)
        }
    }

    pub fn with_status(mut self, status: WillStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_session_at(mut self, at: DateTime<Utc>) -> Self {
        self.session_scheduled_at = Some(at);
        self
    }

    pub fn with_check_in_time(mut self, hhmm: &str) -> Self {
        self.check_in_time = Some(hhmm.to_string());
        self
    }

    pub fn with_timezone(mut self, tz: &str) -> Self {
        self.timezone = Some(tz.to_string());
        self
    }
}

/// One participant's pledge inside a will.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commitment {
    pub id: String,
    pub will_id: String,
    pub user_id: String,
    pub what: String,
    pub why: String,
    pub cadence: CheckInCadence,
    /// Personal local `HH:MM`; falls back to the will's time when unset.
    pub check_in_time: Option<String>,
    pub check_in_reminder_sent_at: Option<DateTime<Utc>>,
    pub review_reminder_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub will_id: String,
    pub user_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Scheduling-relevant slice of a user profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub display_name: String,
    /// IANA zone name; invalid names are treated as UTC.
    pub timezone: String,
    pub daily_reminder_time: Option<String>,
    pub daily_reminder_enabled: bool,
    pub created_at: DateTime<Utc>,
}

/// One-shot stamp columns on `wills`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WillStamp {
    Started,
    Midpoint,
    Completion,
}

impl WillStamp {
    pub(crate) fn column(self) -> &'static str {
        match self {
            WillStamp::Started => "started_notification_sent_at",
            WillStamp::Midpoint => "midpoint_notification_sent_at",
            WillStamp::Completion => "completion_notification_sent_at",
        }
    }
}

/// One-shot stamp columns on `commitments`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitmentStamp {
    CheckInReminder,
    ReviewReminder,
}

impl CommitmentStamp {
    pub(crate) fn column(self) -> &'static str {
        match self {
            CommitmentStamp::CheckInReminder => "check_in_reminder_sent_at",
            CommitmentStamp::ReviewReminder => "review_reminder_sent_at",
        }
    }
}
