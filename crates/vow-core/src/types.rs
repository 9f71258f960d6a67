use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a will (a commitment cycle).
///
/// Only ever moves forward in declaration order. `WaitingForEndRoom` is a
/// legacy value written by older releases; it sits on the active/review
/// boundary and is folded into `WillReview` on startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WillStatus {
    Pending,
    Scheduled,
    Active,
    WaitingForEndRoom,
    WillReview,
    Completed,
}

impl WillStatus {
    /// Position in the forward-only lifecycle. A transition is legal only
    /// when it strictly increases the rank.
    pub fn rank(self) -> u8 {
        match self {
            WillStatus::Pending => 0,
            WillStatus::Scheduled => 1,
            WillStatus::Active => 2,
            WillStatus::WaitingForEndRoom => 3,
            WillStatus::WillReview => 4,
            WillStatus::Completed => 5,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, WillStatus::Completed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WillStatus::Pending => "pending",
            WillStatus::Scheduled => "scheduled",
            WillStatus::Active => "active",
            WillStatus::WaitingForEndRoom => "waiting_for_end_room",
            WillStatus::WillReview => "will_review",
            WillStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for WillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WillStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(WillStatus::Pending),
            "scheduled" => Ok(WillStatus::Scheduled),
            "active" => Ok(WillStatus::Active),
            "waiting_for_end_room" => Ok(WillStatus::WaitingForEndRoom),
            "will_review" => Ok(WillStatus::WillReview),
            "completed" => Ok(WillStatus::Completed),
            other => Err(format!("unknown will status: {other}")),
        }
    }
}

/// Circle wills belong to a group and may carry a session window; solo wills never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WillMode {
    Circle,
    Solo,
}

impl WillMode {
    pub fn as_str(self) -> &'static str {
        match self {
            WillMode::Circle => "circle",
            WillMode::Solo => "solo",
        }
    }
}

impl fmt::Display for WillMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WillMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "circle" => Ok(WillMode::Circle),
            "solo" => Ok(WillMode::Solo),
            other => Err(format!("unknown will mode: {other}")),
        }
    }
}

/// State of the video session nested inside a circle will.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Open,
    Completed,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Open => "open",
            SessionStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SessionStatus::Pending),
            "open" => Ok(SessionStatus::Open),
            "completed" => Ok(SessionStatus::Completed),
            other => Err(format!("unknown session status: {other}")),
        }
    }
}

/// How often a participant checks in on their commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckInCadence {
    #[serde(rename = "daily")]
    Daily,
    #[serde(rename = "one-time")]
    OneTime,
}

impl CheckInCadence {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckInCadence::Daily => "daily",
            CheckInCadence::OneTime => "one-time",
        }
    }
}

impl fmt::Display for CheckInCadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CheckInCadence {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "daily" => Ok(CheckInCadence::Daily),
            "one-time" | "one_time" => Ok(CheckInCadence::OneTime),
            other => Err(format!("unknown check-in cadence: {other}")),
        }
    }
}

/// Every kind of notification the scheduler emits. Also used as the
/// category key in the per-user daily dedup log and the marker table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    WillStarted,
    ReviewRequired,
    #[serde(rename = "session_warning_24h")]
    SessionWarning24h,
    #[serde(rename = "session_warning_15m")]
    SessionWarning15m,
    SessionLive,
    Midpoint,
    JoinReminder,
    ReviewReminder,
    DailyReminder,
    Motivational,
}

impl NotificationCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationCategory::WillStarted => "will_started",
            NotificationCategory::ReviewRequired => "review_required",
            NotificationCategory::SessionWarning24h => "session_warning_24h",
            NotificationCategory::SessionWarning15m => "session_warning_15m",
            NotificationCategory::SessionLive => "session_live",
            NotificationCategory::Midpoint => "midpoint",
            NotificationCategory::JoinReminder => "join_reminder",
            NotificationCategory::ReviewReminder => "review_reminder",
            NotificationCategory::DailyReminder => "daily_reminder",
            NotificationCategory::Motivational => "motivational",
        }
    }
}

impl fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_rank_follows_lifecycle_order() {
        let order = [
            WillStatus::Pending,
            WillStatus::Scheduled,
            WillStatus::Active,
            WillStatus::WaitingForEndRoom,
            WillStatus::WillReview,
            WillStatus::Completed,
        ];
        for pair in order.windows(2) {
            assert!(pair[0].rank() < pair[1].rank(), "{} !< {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn legacy_status_parses() {
        assert_eq!(
            WillStatus::from_str("waiting_for_end_room").unwrap(),
            WillStatus::WaitingForEndRoom
        );
        assert!(WillStatus::from_str("archived").is_err());
    }

    #[test]
    fn cadence_accepts_hyphenated_and_underscored() {
        assert_eq!(CheckInCadence::from_str("one-time").unwrap(), CheckInCadence::OneTime);
        assert_eq!(CheckInCadence::from_str("one_time").unwrap(), CheckInCadence::OneTime);
        assert_eq!(CheckInCadence::OneTime.to_string(), "one-time");
    }

    #[test]
    fn category_serializes_snake_case() {
        let json = serde_json::to_string(&NotificationCategory::SessionWarning15m).unwrap();
        assert_eq!(json, "\"session_warning_15m\"");
    }
}
