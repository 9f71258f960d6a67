use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    error::{Result, TransportError},
    transport::NotificationTransport,
    types::Notification,
};

/// Hands notifications to an HTTP push gateway.
///
/// Each send is one `POST` of `{ "user_ids": [...], "notification": {...} }`.
/// The gateway owns device tokens and fan-out to APNs/FCM.
pub struct WebhookTransport {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

#[derive(Serialize)]
struct PushRequest<'a> {
    user_ids: &'a [String],
    notification: &'a Notification,
}

impl WebhookTransport {
    pub fn new(url: String, token: Option<String>, timeout: Duration) -> Result<Self> {
        if url.trim().is_empty() {
            return Err(TransportError::Config("push webhook_url is empty".to_string()));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url, token })
    }

    pub fn from_config(cfg: &vow_core::config::PushConfig) -> Result<Self> {
        Self::new(
            cfg.webhook_url.clone(),
            cfg.token.clone(),
            Duration::from_secs(cfg.timeout_secs),
        )
    }
}

#[async_trait]
impl NotificationTransport for WebhookTransport {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send_to_users(&self, user_ids: &[String], notification: &Notification) -> Result<()> {
        if user_ids.is_empty() {
            return Ok(());
        }

        let mut req = self.client.post(&self.url).json(&PushRequest {
            user_ids,
            notification,
        });
        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }

        debug!(category = %notification.category, recipients = user_ids.len(), "posting push webhook");
        let resp = req.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %text, "push webhook rejected notification");
            return Err(TransportError::Rejected {
                status: status.as_u16(),
                message: text,
            });
        }
        Ok(())
    }
}
