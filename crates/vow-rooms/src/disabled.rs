use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{Result, RoomError};
use crate::provider::RoomProvider;
use crate::types::{Room, RoomInfo};

/// Stand-in when no room service is configured. Sessions still open and
/// close on time, just without a URL.
#[derive(Debug, Default, Clone)]
pub struct DisabledRoomProvider;

#[async_trait]
impl RoomProvider for DisabledRoomProvider {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn create_room(&self, _will_id: &str, _start: DateTime<Utc>, _minutes: u32) -> Result<Room> {
        Err(RoomError::NotConfigured)
    }

    async fn delete_room(&self, _url: &str) -> Result<()> {
        Ok(())
    }

    async fn room_info(&self, _url: &str) -> Result<Option<RoomInfo>> {
        Ok(None)
    }
}
