use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use vow_core::{SessionStatus, WillMode};
use vow_notify::{Notification, NotificationTransport};
use vow_rooms::RoomProvider;
use vow_store::{Store, Will, WillFilter};

use crate::error::{Result, SchedulerError};
use crate::lifecycle::LifecycleDriver;

/// Opens and closes the video-session window nested in circle wills.
///
/// `pending → open` is claimed in the store before the room is requested,
/// so two overlapping ticks never create two rooms for one session.
#[derive(Clone)]
pub struct SessionCoordinator {
    store: Store,
    rooms: Arc<dyn RoomProvider>,
    transport: Arc<dyn NotificationTransport>,
    lifecycle: LifecycleDriver,
    session_minutes: u32,
    provider_timeout: Duration,
    batch_limit: usize,
}

impl SessionCoordinator {
    pub fn new(
        store: Store,
        rooms: Arc<dyn RoomProvider>,
        transport: Arc<dyn NotificationTransport>,
        lifecycle: LifecycleDriver,
        session_minutes: u32,
        provider_timeout: Duration,
        batch_limit: usize,
    ) -> Self {
        Self {
            store,
            rooms,
            transport,
            lifecycle,
            session_minutes,
            provider_timeout,
            batch_limit,
        }
    }

    /// Open every pending session whose scheduled time has passed.
    /// Returns how many this call opened.
    pub async fn open_due(&self, now: DateTime<Utc>) -> Result<usize> {
        let filter = WillFilter::new()
            .mode(WillMode::Circle)
            .session_status(SessionStatus::Pending)
            .session_scheduled_between(None, Some(now));
        let due = self.store.find_wills(&filter, Some(self.batch_limit))?;

        let mut opened = 0;
        for will in due {
            match self.open_one(&will, now).await {
                Ok(true) => opened += 1,
                Ok(false) => debug!(will_id = %will.id, "session already opened by another tick"),
                Err(e) => warn!(will_id = %will.id, error = %e, "failed to open session"),
            }
        }
        Ok(opened)
    }

    async fn open_one(&self, will: &Will, now: DateTime<Utc>) -> Result<bool> {
        if !self.store.open_session(&will.id, now)? {
            return Ok(false);
        }

        let url = match will.session_url.clone() {
            Some(url) => Some(url),
            None => self.create_room(will).await,
        };
        info!(will_id = %will.id, has_url = url.is_some(), "session opened");

        let recipients = self.store.participant_ids(&will.id)?;
        if let Err(e) = self
            .transport
            .send_to_users(&recipients, &Notification::session_live(&will.id, url.as_deref()))
            .await
        {
            warn!(will_id = %will.id, error = %e, "session-live notification failed");
        }
        Ok(true)
    }

    /// Ask the provider for a room. Any failure degrades to no URL.
    async fn create_room(&self, will: &Will) -> Option<String> {
        let start = will.session_scheduled_at.unwrap_or(will.start_at);
        let call = self.rooms.create_room(&will.id, start, self.session_minutes);
        let room = match tokio::time::timeout(self.provider_timeout, call).await {
            Ok(Ok(room)) => room,
            Ok(Err(e)) => {
                warn!(will_id = %will.id, provider = %self.rooms.name(), error = %e, "room creation failed, opening without url");
                return None;
            }
            Err(_) => {
                let e = SchedulerError::Timeout {
                    ms: self.provider_timeout.as_millis() as u64,
                };
                warn!(will_id = %will.id, provider = %self.rooms.name(), error = %e, "room creation timed out, opening without url");
                return None;
            }
        };

        match self.store.set_session_url(&will.id, &room.url) {
            Ok(true) => Some(room.url),
            Ok(false) => {
                // A url appeared meanwhile; keep the stored one.
                self.store.get_will(&will.id).ok().flatten().and_then(|w| w.session_url)
            }
            Err(e) => {
                warn!(will_id = %will.id, error = %e, "failed to record session url");
                Some(room.url)
            }
        }
    }

    /// Close every open session that has run its full duration, then
    /// re-check completion for each closed will. Returns how many closed.
    pub async fn close_due(&self, now: DateTime<Utc>) -> Result<usize> {
        let cutoff = now - chrono::Duration::minutes(i64::from(self.session_minutes));
        let filter = WillFilter::new()
            .session_status(SessionStatus::Open)
            .session_opened_before(cutoff);
        let due = self.store.find_wills(&filter, Some(self.batch_limit))?;

        let mut closed = 0;
        for will in due {
            match self.store.close_session(&will.id, now) {
                Ok(true) => {}
                Ok(false) => {
                    debug!(will_id = %will.id, "session already closed by another tick");
                    continue;
                }
                Err(e) => {
                    warn!(will_id = %will.id, error = %e, "failed to close session");
                    continue;
                }
            }
            closed += 1;
            info!(will_id = %will.id, "session closed");

            match self.lifecycle.try_complete(&will.id, now) {
                Ok(true) => info!(will_id = %will.id, "will completed after session close"),
                Ok(false) => {}
                Err(e) => warn!(will_id = %will.id, error = %e, "completion check failed"),
            }

            if let Some(ref url) = will.session_url {
                self.delete_room(&will.id, url).await;
            }
        }
        Ok(closed)
    }

    async fn delete_room(&self, will_id: &str, url: &str) {
        match tokio::time::timeout(self.provider_timeout, self.rooms.delete_room(url)).await {
            Ok(Ok(())) => debug!(will_id = %will_id, "room deleted"),
            Ok(Err(e)) => debug!(will_id = %will_id, error = %e, "room deletion failed, ignoring"),
            Err(_) => debug!(will_id = %will_id, "room deletion timed out, ignoring"),
        }
    }
}
