use serde::{Deserialize, Serialize};
use serde_json::json;
use vow_core::NotificationCategory;

/// A push notification as handed to a transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub category: NotificationCategory,
    /// Deep-link payload for the client (`will_id`, `url`, …).
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Notification {
    pub fn new(category: NotificationCategory, title: &str, body: &str) -> Self {
        Self {
            title: title.to_string(),
            body: body.to_string(),
            category,
            data: json!({}),
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    pub fn will_started(will_id: &str) -> Self {
        Self::new(
            NotificationCategory::WillStarted,
            "Your Will has started",
            "Today is day one. Show up for what you committed to.",
        )
        .with_data(json!({ "will_id": will_id }))
    }

    pub fn review_required(will_id: &str) -> Self {
        Self::new(
            NotificationCategory::ReviewRequired,
            "Time to review",
            "Your Will has ended. Take a moment to reflect and submit your review.",
        )
        .with_data(json!({ "will_id": will_id }))
    }

    pub fn session_warning(will_id: &str, category: NotificationCategory) -> Self {
        let body = match category {
            NotificationCategory::SessionWarning24h => "Your circle session starts in 24 hours.",
            _ => "Your circle session starts in 15 minutes.",
        };
        Self::new(category, "Session coming up", body).with_data(json!({ "will_id": will_id }))
    }

    pub fn session_live(will_id: &str, url: Option<&str>) -> Self {
        Self::new(
            NotificationCategory::SessionLive,
            "Your session is live",
            "Your circle is gathering now. Join the call.",
        )
        .with_data(json!({ "will_id": will_id, "url": url }))
    }

    pub fn midpoint(will_id: &str) -> Self {
        Self::new(
            NotificationCategory::Midpoint,
            "Halfway there",
            "You're at the midpoint of your Will. Keep going.",
        )
        .with_data(json!({ "will_id": will_id }))
    }

    pub fn join_reminder(will_id: &str) -> Self {
        Self::new(
            NotificationCategory::JoinReminder,
            "Your circle is waiting",
            "A Will in your circle is waiting for your commitment.",
        )
        .with_data(json!({ "will_id": will_id }))
    }

    pub fn review_reminder(will_id: &str) -> Self {
        Self::new(
            NotificationCategory::ReviewReminder,
            "Review still pending",
            "Your circle can't close the Will until you submit your review.",
        )
        .with_data(json!({ "will_id": will_id }))
    }

    pub fn daily_reminder(will_id: Option<&str>) -> Self {
        Self::new(
            NotificationCategory::DailyReminder,
            "Daily check-in",
            "How did today go? Check in on your commitment.",
        )
        .with_data(json!({ "will_id": will_id }))
    }

    pub fn motivational(will_id: &str, what: &str) -> Self {
        let body = if what.is_empty() {
            "Remember why you started.".to_string()
        } else {
            format!("Remember why you started: {what}")
        };
        Self::new(NotificationCategory::Motivational, "Keep going", &body)
            .with_data(json!({ "will_id": will_id }))
    }
}
