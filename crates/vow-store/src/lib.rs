//! `vow-store`: SQLite persistence for wills, participants and the
//! notification dedup records.
//!
//! All scheduler-owned mutation goes through conditional writes:
//!
//! | Operation                   | Guard                                   |
//! |-----------------------------|-----------------------------------------|
//! | `update_will_status`        | `WHERE status = <expected>`             |
//! | `open_session`/`close_session` | `WHERE session_status = <expected>`  |
//! | `claim_will_stamp`          | `WHERE <column> IS NULL`                |
//! | `claim_commitment_stamp`    | `WHERE <column> IS NULL`                |
//! | `claim_will_user_reminder`  | `INSERT OR IGNORE` on the marker key    |
//! | `claim_daily`               | upsert only when the local date differs |
//!
//! A `true` return means this caller won and must act; `false` means some
//! other tick got there first.

pub mod claims;
pub mod db;
pub mod error;
pub mod filter;
pub mod participants;
pub mod store;
pub mod types;
pub mod users;

pub use error::{Result, StoreError};
pub use filter::WillFilter;
pub use store::Store;
pub use types::{Commitment, CommitmentStamp, NewWill, Review, User, Will, WillStamp};
