//! `vow-scheduler`: advances wills through their lifecycle and sends the
//! notifications that go with it.
//!
//! # Components
//!
//! | Module          | Role                                                     |
//! |-----------------|----------------------------------------------------------|
//! | `transition`    | pure next-status decision                                |
//! | `lifecycle`     | loads candidates, persists transitions by compare-and-set |
//! | `session`       | opens/closes the circle video-session window             |
//! | `notifications` | every notification category, each behind a store claim   |
//! | `daily_time`    | stable per-user daily send time                          |
//! | `engine`        | the heavy and light periodic ticks                       |
//!
//! Nothing here holds an in-process lock across a decision. Two engines on
//! the same database are safe because every write is conditional.

pub mod daily_time;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod notifications;
pub mod session;
pub mod transition;

pub use engine::{SchedulerEngine, TickReport};
pub use error::{Result, SchedulerError};
pub use lifecycle::{LifecycleDriver, TransitionReport};
pub use notifications::{NotificationScheduler, NotificationTally};
pub use session::SessionCoordinator;
pub use transition::next_status;
