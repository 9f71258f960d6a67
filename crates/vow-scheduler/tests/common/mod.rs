#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use vow_core::config::{SchedulerConfig, DEFAULT_HTTP_TIMEOUT_SECS};
use vow_core::NotificationCategory;
use vow_notify::{Notification, NotificationTransport, TransportError};
use vow_rooms::{Room, RoomError, RoomInfo, RoomProvider};
use vow_scheduler::SchedulerEngine;
use vow_store::Store;

/// Records every send instead of delivering it.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(Vec<String>, Notification)>>,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<(Vec<String>, Notification)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self, category: NotificationCategory) -> usize {
        self.sent()
            .iter()
            .filter(|(_, n)| n.category == category)
            .count()
    }

    /// Every recipient of `category`, flattened and sorted.
    pub fn recipients(&self, category: NotificationCategory) -> Vec<String> {
        let mut out: Vec<String> = self
            .sent()
            .into_iter()
            .filter(|(_, n)| n.category == category)
            .flat_map(|(ids, _)| ids)
            .collect();
        out.sort();
        out
    }
}

#[async_trait]
impl NotificationTransport for RecordingTransport {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send_to_users(&self, user_ids: &[String], n: &Notification) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push((user_ids.to_vec(), n.clone()));
        Ok(())
    }
}

/// Room provider double; `fail` makes every creation error out and
/// `delay` holds every creation back that long.
#[derive(Default)]
pub struct FakeRooms {
    pub fail: bool,
    pub delay: Option<Duration>,
    pub created: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
}

impl FakeRooms {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }
}

#[async_trait]
impl RoomProvider for FakeRooms {
    fn name(&self) -> &str {
        "fake"
    }

    async fn create_room(&self, will_id: &str, start: DateTime<Utc>, minutes: u32) -> Result<Room, RoomError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(RoomError::Api {
                status: 503,
                message: "provider down".into(),
            });
        }
        self.created.lock().unwrap().push(will_id.to_string());
        Ok(Room {
            name: format!("room-{will_id}"),
            url: format!("https://rooms.test/room-{will_id}"),
            expires_at: Some(start + chrono::Duration::minutes(i64::from(minutes))),
        })
    }

    async fn delete_room(&self, url: &str) -> Result<(), RoomError> {
        self.deleted.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn room_info(&self, _url: &str) -> Result<Option<RoomInfo>, RoomError> {
        Ok(None)
    }
}

pub struct Harness {
    pub store: Store,
    pub transport: Arc<RecordingTransport>,
    pub rooms: Arc<FakeRooms>,
    pub engine: SchedulerEngine,
}

pub fn harness() -> Harness {
    harness_with(FakeRooms::default())
}

pub fn harness_with(rooms: FakeRooms) -> Harness {
    harness_custom(rooms, SchedulerConfig::default(), Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
}

pub fn harness_custom(rooms: FakeRooms, cfg: SchedulerConfig, provider_timeout: Duration) -> Harness {
    let store = Store::open_in_memory().unwrap();
    let transport = Arc::new(RecordingTransport::default());
    let rooms = Arc::new(rooms);
    let engine = engine_on(store.clone(), transport.clone(), rooms.clone(), cfg, provider_timeout);
    Harness {
        store,
        transport,
        rooms,
        engine,
    }
}

pub fn engine_on(
    store: Store,
    transport: Arc<RecordingTransport>,
    rooms: Arc<FakeRooms>,
    cfg: SchedulerConfig,
    provider_timeout: Duration,
) -> SchedulerEngine {
    SchedulerEngine::new(store, transport, rooms, cfg, provider_timeout)
}

/// A fixed instant well clear of midnight in the zones the tests use.
pub fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
}
