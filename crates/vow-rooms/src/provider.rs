use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{Room, RoomInfo};

/// External video-room service.
///
/// Callers bound every call with their own timeout and treat failures as
/// non-fatal: a session opens without a URL, a room that cannot be deleted
/// simply expires.
#[async_trait]
pub trait RoomProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Create a room usable from shortly before `scheduled_start` until
    /// `duration_minutes` after it.
    async fn create_room(
        &self,
        will_id: &str,
        scheduled_start: DateTime<Utc>,
        duration_minutes: u32,
    ) -> Result<Room>;

    /// Best-effort removal of the room behind `url`.
    async fn delete_room(&self, url: &str) -> Result<()>;

    /// `None` when the room no longer exists.
    async fn room_info(&self, url: &str) -> Result<Option<RoomInfo>>;
}
