use async_trait::async_trait;
use tracing::info;

use crate::{error::Result, transport::NotificationTransport, types::Notification};

/// Writes every notification to the log instead of delivering it.
/// Used when no push endpoint is configured.
#[derive(Debug, Default, Clone)]
pub struct LogTransport;

impl LogTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationTransport for LogTransport {
    fn name(&self) -> &str {
        "log"
    }

    async fn send_to_users(&self, user_ids: &[String], notification: &Notification) -> Result<()> {
        info!(
            category = %notification.category,
            recipients = user_ids.len(),
            title = %notification.title,
            "notification (log only)"
        );
        Ok(())
    }
}
