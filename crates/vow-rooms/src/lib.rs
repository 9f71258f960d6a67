//! `vow-rooms`: the video-room provider behind circle sessions.

pub mod daily;
pub mod disabled;
pub mod error;
pub mod provider;
pub mod types;

pub use daily::DailyRoomProvider;
pub use disabled::DisabledRoomProvider;
pub use error::{Result, RoomError};
pub use provider::RoomProvider;
pub use types::{Room, RoomInfo};
