//! `vow-notify`: push-notification payloads and the transports that
//! deliver them. From the scheduler's side every send is fire-and-forget:
//! errors are returned for logging, never retried here.

pub mod error;
pub mod fanout;
pub mod log;
pub mod transport;
pub mod types;
pub mod webhook;

pub use error::{Result, TransportError};
pub use fanout::FanoutTransport;
pub use log::LogTransport;
pub use transport::NotificationTransport;
pub use types::Notification;
pub use webhook::WebhookTransport;
