//! Pure lifecycle decisions. No I/O: everything the rules need is passed in.

use chrono::{DateTime, Utc};
use vow_core::WillStatus;
use vow_store::Will;

/// Decide the status a will should move to at `now`, or `None` to stay put.
///
/// Rules, in priority order:
/// 1. `pending`/`scheduled` and started → `active`
/// 2. `active`/`scheduled`/`waiting_for_end_room` and ended → `will_review`
///    (applied to the result of rule 1, so a short will can pass straight
///    through `active` in one evaluation)
/// 3. persisted `will_review` → `completed` once every participant has
///    reviewed and any session window is finished
///
/// Rule 3 looks at the *persisted* status only. A will that reaches
/// `will_review` in this evaluation is not completed until the next one.
pub fn next_status(
    will: &Will,
    now: DateTime<Utc>,
    participant_count: u64,
    review_count: u64,
) -> Option<WillStatus> {
    if will.status.is_terminal() {
        return None;
    }
    let mut status = will.status;

    if matches!(status, WillStatus::Pending | WillStatus::Scheduled) && now >= will.start_at {
        status = WillStatus::Active;
    }

    if matches!(
        status,
        WillStatus::Active | WillStatus::Scheduled | WillStatus::WaitingForEndRoom
    ) && will.end_at.is_some_and(|end| now >= end)
    {
        status = WillStatus::WillReview;
    }

    if will.status == WillStatus::WillReview
        && completion_ready(will, participant_count, review_count)
    {
        status = WillStatus::Completed;
    }

    (status != will.status).then_some(status)
}

/// Both completion conditions: all reviews in, and no unfinished session.
pub fn completion_ready(will: &Will, participant_count: u64, review_count: u64) -> bool {
    review_count >= participant_count && !will.has_unfinished_session()
}
