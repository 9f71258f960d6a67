use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use vow_core::WillStatus;
use vow_store::{Store, Will, WillFilter};

use crate::error::Result;
use crate::transition::next_status;

/// What one transition pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransitionReport {
    pub activated: usize,
    pub to_review: usize,
    pub completed: usize,
    /// Another tick moved the will first.
    pub raced: usize,
    pub failed: usize,
}

/// Loads candidate wills, asks [`next_status`] where each should be, and
/// persists the answer with a compare-and-set on the status it read.
#[derive(Clone)]
pub struct LifecycleDriver {
    store: Store,
    batch_limit: usize,
}

impl LifecycleDriver {
    pub fn new(store: Store, batch_limit: usize) -> Self {
        Self { store, batch_limit }
    }

    /// One pass over every status group.
    ///
    /// Each group only selects wills that can move now, so wills that wait
    /// on a missing review never fill the batch ahead of ones that are ready.
    ///
    /// All groups are loaded before anything is written, so a will that
    /// reaches `will_review` during this pass is not also checked for
    /// completion until the next one.
    pub fn run_transitions(&self, now: DateTime<Utc>) -> Result<TransitionReport> {
        let limit = Some(self.batch_limit);
        let groups = [
            WillFilter::new()
                .statuses(&[WillStatus::Pending, WillStatus::Scheduled])
                .started_by(now),
            WillFilter::new()
                .statuses(&[
                    WillStatus::Active,
                    WillStatus::Scheduled,
                    WillStatus::WaitingForEndRoom,
                ])
                .ended_by(now),
            WillFilter::new()
                .status(WillStatus::WillReview)
                .ready_to_complete(),
        ];

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for filter in &groups {
            for will in self.store.find_wills(filter, limit)? {
                if seen.insert(will.id.clone()) {
                    candidates.push(will);
                }
            }
        }

        let mut report = TransitionReport::default();
        for will in candidates {
            match self.advance(&will, now) {
                Ok(Some(to)) => match to {
                    WillStatus::Active => report.activated += 1,
                    WillStatus::WillReview => report.to_review += 1,
                    WillStatus::Completed => report.completed += 1,
                    _ => {}
                },
                Ok(None) => {}
                Err(AdvanceError::Raced) => report.raced += 1,
                Err(AdvanceError::Store(e)) => {
                    warn!(will_id = %will.id, error = %e, "transition failed, retrying next tick");
                    report.failed += 1;
                }
            }
        }

        if report != TransitionReport::default() {
            info!(
                activated = report.activated,
                to_review = report.to_review,
                completed = report.completed,
                raced = report.raced,
                failed = report.failed,
                "transition pass finished"
            );
        }
        Ok(report)
    }

    /// Re-check completion for one will. Used right after its session
    /// window closes, since that may have been the last missing condition.
    ///
    /// Returns `true` if this call moved the will to `completed`.
    pub fn try_complete(&self, will_id: &str, now: DateTime<Utc>) -> Result<bool> {
        let Some(will) = self.store.get_will(will_id)? else {
            warn!(will_id = %will_id, "will vanished before completion check");
            return Ok(false);
        };
        if will.status != WillStatus::WillReview {
            return Ok(false);
        }
        match self.advance(&will, now) {
            Ok(next) => Ok(next == Some(WillStatus::Completed)),
            Err(AdvanceError::Raced) => Ok(false),
            Err(AdvanceError::Store(e)) => Err(e.into()),
        }
    }

    fn advance(&self, will: &Will, now: DateTime<Utc>) -> std::result::Result<Option<WillStatus>, AdvanceError> {
        // Counts only gate completion; recomputed every time since reviews
        // arrive between ticks.
        let (participants, reviews) = if will.status == WillStatus::WillReview {
            (
                self.store.count_participants(&will.id)?,
                self.store.count_reviews(&will.id)?,
            )
        } else {
            (0, 0)
        };

        let Some(to) = next_status(will, now, participants, reviews) else {
            return Ok(None);
        };
        if self.store.update_will_status(&will.id, will.status, to, now)? {
            Ok(Some(to))
        } else {
            debug!(will_id = %will.id, from = %will.status, %to, "lost status race");
            Err(AdvanceError::Raced)
        }
    }
}

enum AdvanceError {
    Raced,
    Store(vow_store::StoreError),
}

impl From<vow_store::StoreError> for AdvanceError {
    fn from(e: vow_store::StoreError) -> Self {
        AdvanceError::Store(e)
    }
}
