//! `vow-core`: types, configuration and time utilities shared by every
//! crate in the commitment-cycle scheduler.

pub mod config;
pub mod error;
pub mod time;
pub mod types;

pub use config::VowConfig;
pub use error::{Result, VowError};
pub use types::{CheckInCadence, NotificationCategory, SessionStatus, WillMode, WillStatus};
