use async_trait::async_trait;

use crate::{error::Result, types::Notification};

/// Delivery backend for scheduler notifications (push gateway, webhook, log…).
///
/// Implementations must be `Send + Sync` so one instance can be shared by
/// both scheduler ticks through an `Arc`.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    /// Stable lowercase identifier used in logs (e.g. `"webhook"`).
    fn name(&self) -> &str;

    /// Deliver `notification` to every user in `user_ids`.
    ///
    /// Callers never pass an empty slice; implementations may still treat
    /// one as a no-op.
    async fn send_to_users(&self, user_ids: &[String], notification: &Notification) -> Result<()>;
}
