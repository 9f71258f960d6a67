//! Every notification category the scheduler sends.
//!
//! Each send is preceded by a claim in the store (a will stamp, a
//! commitment stamp, a marker row, or the per-user daily log). Whoever wins
//! the claim sends; everyone else skips. A send that fails after a won claim
//! is logged and not retried, so delivery is at most once.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, warn};
use vow_core::config::SchedulerConfig;
use vow_core::time::{self, local_time};
use vow_core::{CheckInCadence, NotificationCategory, SessionStatus, WillMode, WillStatus};
use vow_notify::{Notification, NotificationTransport};
use vow_store::{Commitment, CommitmentStamp, Store, User, Will, WillFilter, WillStamp};

use crate::daily_time::{daily_time, DailyWindow};
use crate::error::Result;

/// Slack added to the pre-session warning bucket so two ticks that drift
/// apart by a few seconds still cover every minute between them.
const WARNING_GRACE_SECS: i64 = 30;

/// Outcome counts for one or more notification passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NotificationTally {
    /// Transport calls that succeeded.
    pub sent: usize,
    /// Transport calls that failed after the claim was won.
    pub failed: usize,
}

impl NotificationTally {
    pub fn merge(&mut self, other: NotificationTally) {
        self.sent += other.sent;
        self.failed += other.failed;
    }
}

#[derive(Clone)]
pub struct NotificationScheduler {
    store: Store,
    transport: Arc<dyn NotificationTransport>,
    cfg: SchedulerConfig,
}

impl NotificationScheduler {
    pub fn new(store: Store, transport: Arc<dyn NotificationTransport>, cfg: SchedulerConfig) -> Self {
        Self {
            store,
            transport,
            cfg,
        }
    }

    /// Rows per query. Recipient passes read every candidate, one page
    /// at a time, so wills that were already served never hide later ones.
    fn page_size(&self) -> usize {
        self.cfg.batch_limit
    }

    async fn deliver(&self, user_ids: &[String], n: &Notification, tally: &mut NotificationTally) {
        if user_ids.is_empty() {
            return;
        }
        match self.transport.send_to_users(user_ids, n).await {
            Ok(()) => tally.sent += 1,
            Err(e) => {
                warn!(category = %n.category, recipients = user_ids.len(), error = %e, "notification send failed");
                tally.failed += 1;
            }
        }
    }

    /// All categories driven by the heavy tick. Run after transitions so
    /// wills that just changed status are seen in their new state.
    pub async fn run_heavy(&self, now: DateTime<Utc>) -> NotificationTally {
        let mut tally = NotificationTally::default();
        let passes = [
            ("will_started", self.notify_started(now).await),
            ("review_required", self.notify_review_required(now).await),
            ("midpoint", self.notify_midpoint(now).await),
            ("join_reminder", self.notify_join_reminders(now).await),
            ("review_reminder", self.notify_review_reminders(now).await),
            ("daily_reminder", self.notify_daily_reminders(now).await),
            ("check_in", self.notify_check_ins(now).await),
            ("motivational", self.notify_motivational(now).await),
        ];
        for (name, result) in passes {
            match result {
                Ok(t) => tally.merge(t),
                Err(e) => warn!(pass = name, error = %e, "notification pass failed"),
            }
        }
        tally
    }

    /// The time-critical pre-session warnings, driven by the light tick.
    pub async fn run_light(&self, now: DateTime<Utc>) -> NotificationTally {
        let mut tally = NotificationTally::default();
        for (offset, category) in [
            (Duration::hours(24), NotificationCategory::SessionWarning24h),
            (Duration::minutes(15), NotificationCategory::SessionWarning15m),
        ] {
            match self.notify_session_warnings(now, offset, category).await {
                Ok(t) => tally.merge(t),
                Err(e) => warn!(category = %category, error = %e, "session warning pass failed"),
            }
        }
        tally
    }

    // --- one-shot per will ------------------------------------------------

    async fn notify_will_stamp(
        &self,
        filter: WillFilter,
        stamp: WillStamp,
        now: DateTime<Utc>,
        build: fn(&str) -> Notification,
    ) -> Result<NotificationTally> {
        let mut tally = NotificationTally::default();
        for will in self.store.scan_wills(&filter.unstamped(stamp), self.page_size())? {
            match self.store.claim_will_stamp(&will.id, stamp, now) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    warn!(will_id = %will.id, ?stamp, error = %e, "stamp claim failed");
                    continue;
                }
            }
            match self.store.participant_ids(&will.id) {
                Ok(recipients) => self.deliver(&recipients, &build(&will.id), &mut tally).await,
                Err(e) => warn!(will_id = %will.id, error = %e, "could not resolve recipients"),
            }
        }
        Ok(tally)
    }

    pub async fn notify_started(&self, now: DateTime<Utc>) -> Result<NotificationTally> {
        let filter = WillFilter::new().status(WillStatus::Active);
        self.notify_will_stamp(filter, WillStamp::Started, now, Notification::will_started)
            .await
    }

    pub async fn notify_review_required(&self, now: DateTime<Utc>) -> Result<NotificationTally> {
        let filter = WillFilter::new().status(WillStatus::WillReview);
        self.notify_will_stamp(filter, WillStamp::Completion, now, Notification::review_required)
            .await
    }

    pub async fn notify_midpoint(&self, now: DateTime<Utc>) -> Result<NotificationTally> {
        let filter = WillFilter::new().status(WillStatus::Active).midpoint_by(now);
        self.notify_will_stamp(filter, WillStamp::Midpoint, now, Notification::midpoint)
            .await
    }

    // --- per (will, user) ---------------------------------------------------

    /// Nudge circle members who still have not committed to a will that has
    /// been pending for a while.
    pub async fn notify_join_reminders(&self, now: DateTime<Utc>) -> Result<NotificationTally> {
        let filter = WillFilter::new()
            .status(WillStatus::Pending)
            .mode(WillMode::Circle)
            .created_by(now - Duration::hours(i64::from(self.cfg.join_reminder_after_hours)));

        let mut tally = NotificationTally::default();
        for will in self.store.scan_wills(&filter, self.page_size())? {
            let members = match self.store.uncommitted_members(&will.id) {
                Ok(m) => m,
                Err(e) => {
                    warn!(will_id = %will.id, error = %e, "could not load uncommitted members");
                    continue;
                }
            };
            for user_id in members {
                if self.claim_marker(&will.id, &user_id, NotificationCategory::JoinReminder, now) {
                    self.deliver(&[user_id], &Notification::join_reminder(&will.id), &mut tally)
                        .await;
                }
            }
        }
        Ok(tally)
    }

    /// Nudge participants who have not reviewed a will that has been in
    /// review for a while.
    pub async fn notify_review_reminders(&self, now: DateTime<Utc>) -> Result<NotificationTally> {
        let filter = WillFilter::new()
            .status(WillStatus::WillReview)
            .in_review_since(now - Duration::hours(i64::from(self.cfg.review_reminder_after_hours)));

        let mut tally = NotificationTally::default();
        for will in self.store.scan_wills(&filter, self.page_size())? {
            let missing = match self.store.commitments_without_review(&will.id) {
                Ok(m) => m,
                Err(e) => {
                    warn!(will_id = %will.id, error = %e, "could not load missing reviewers");
                    continue;
                }
            };
            for c in missing.iter().filter(|c| c.review_reminder_sent_at.is_none()) {
                if self.claim_commitment(c, CommitmentStamp::ReviewReminder, now) {
                    self.deliver(
                        &[c.user_id.clone()],
                        &Notification::review_reminder(&will.id),
                        &mut tally,
                    )
                    .await;
                }
            }
        }
        Ok(tally)
    }

    /// Warn participants `offset` before a pending session.
    ///
    /// Matches sessions scheduled in `[now + offset, now + offset + tick)`,
    /// so each session falls in one tick's bucket; the marker row per
    /// (will, user, category) absorbs overlapping ticks.
    pub async fn notify_session_warnings(
        &self,
        now: DateTime<Utc>,
        offset: Duration,
        category: NotificationCategory,
    ) -> Result<NotificationTally> {
        let tick = Duration::seconds(self.cfg.light_interval_secs as i64 + WARNING_GRACE_SECS);
        let from = now + offset;
        let filter = WillFilter::new()
            .mode(WillMode::Circle)
            .session_status(SessionStatus::Pending)
            .session_scheduled_between(Some(from), Some(from + tick));

        let mut tally = NotificationTally::default();
        for will in self.store.scan_wills(&filter, self.page_size())? {
            let participants = match self.store.participant_ids(&will.id) {
                Ok(p) => p,
                Err(e) => {
                    warn!(will_id = %will.id, error = %e, "could not resolve recipients");
                    continue;
                }
            };
            let winners: Vec<String> = participants
                .into_iter()
                .filter(|user_id| self.claim_marker(&will.id, user_id, category, now))
                .collect();
            self.deliver(&winners, &Notification::session_warning(&will.id, category), &mut tally)
                .await;
        }
        Ok(tally)
    }

    // --- per user, per local day ---------------------------------------------

    /// Daily check-in reminders, from the user's own setting and from the
    /// daily-cadence commitments of active wills. Both share one dedup
    /// record, so a user gets at most one per local day.
    pub async fn notify_daily_reminders(&self, now: DateTime<Utc>) -> Result<NotificationTally> {
        let tol = self.cfg.match_tolerance_minutes;
        let mut tally = NotificationTally::default();

        for user in self.store.users_with_daily_reminder()? {
            let Some(ref target) = user.daily_reminder_time else {
                continue;
            };
            if time::matches_local_time(now, &user.timezone, target, tol)
                && self.claim_daily(
                    &user,
                    NotificationCategory::DailyReminder,
                    time::local_date(now, &user.timezone),
                    now,
                )
            {
                self.deliver(&[user.id.clone()], &Notification::daily_reminder(None), &mut tally)
                    .await;
            }
        }

        for (will, commitments) in self.store.active_participants(self.page_size())? {
            for c in commitments.iter().filter(|c| c.cadence == CheckInCadence::Daily) {
                let Some(target) = check_in_target(&will, c) else {
                    continue;
                };
                let Some(user) = self.participant(&will, c) else {
                    continue;
                };
                let tz = will.timezone.as_deref().unwrap_or(&user.timezone);
                if time::matches_local_time(now, tz, target, tol)
                    && self.claim_daily(
                        &user,
                        NotificationCategory::DailyReminder,
                        time::local_date(now, &user.timezone),
                        now,
                    )
                {
                    self.deliver(
                        &[user.id.clone()],
                        &Notification::daily_reminder(Some(&will.id)),
                        &mut tally,
                    )
                    .await;
                }
            }
        }
        Ok(tally)
    }

    /// Single reminder for one-time commitments, at their check-in time.
    pub async fn notify_check_ins(&self, now: DateTime<Utc>) -> Result<NotificationTally> {
        let tol = self.cfg.match_tolerance_minutes;
        let mut tally = NotificationTally::default();

        for (will, commitments) in self.store.active_participants(self.page_size())? {
            let pending = commitments.iter().filter(|c| {
                c.cadence == CheckInCadence::OneTime && c.check_in_reminder_sent_at.is_none()
            });
            for c in pending {
                let Some(target) = check_in_target(&will, c) else {
                    continue;
                };
                let Some(user) = self.participant(&will, c) else {
                    continue;
                };
                let tz = will.timezone.as_deref().unwrap_or(&user.timezone);
                if time::matches_local_time(now, tz, target, tol)
                    && self.claim_commitment(c, CommitmentStamp::CheckInReminder, now)
                {
                    self.deliver(
                        &[user.id.clone()],
                        &Notification::daily_reminder(Some(&will.id)),
                        &mut tally,
                    )
                    .await;
                }
            }
        }
        Ok(tally)
    }

    /// One motivational message per user per local day, at a time derived
    /// from the user id and date.
    pub async fn notify_motivational(&self, now: DateTime<Utc>) -> Result<NotificationTally> {
        let tol = self.cfg.match_tolerance_minutes;
        let mut tally = NotificationTally::default();

        for (will, commitments) in self.store.active_participants(self.page_size())? {
            for c in &commitments {
                let Some(user) = self.participant(&will, c) else {
                    continue;
                };
                let tz = user.timezone.as_str();
                // A short will gets one slot for its whole span, keyed by the
                // day it started, even when the span runs past midnight.
                let (window, key_date) = match self.short_window(&will, tz) {
                    Some(w) => (w, time::local_date(will.start_at, tz)),
                    None => (
                        DailyWindow::hours(self.cfg.motivational_start_hour, self.cfg.motivational_end_hour),
                        time::local_date(now, tz),
                    ),
                };
                let target = daily_time(&user.id, key_date, window);
                if time::within_window(local_time(now, tz), target, tol)
                    && self.claim_daily(
                        &user,
                        NotificationCategory::Motivational,
                        time::occurrence_date(now, tz, target),
                        now,
                    )
                {
                    self.deliver(
                        &[user.id.clone()],
                        &Notification::motivational(&will.id, &c.what),
                        &mut tally,
                    )
                    .await;
                }
            }
        }
        Ok(tally)
    }

    /// The will's own local start→end span, when it is shorter than a day.
    fn short_window(&self, will: &Will, tz: &str) -> Option<DailyWindow> {
        let short = Duration::hours(i64::from(self.cfg.short_cycle_hours));
        match (will.end_at, will.duration()) {
            (Some(end), Some(d)) if d > Duration::zero() && d < short => Some(
                DailyWindow::between(local_time(will.start_at, tz), local_time(end, tz)),
            ),
            _ => None,
        }
    }

    // --- claim helpers: a storage error counts as a lost claim ---------------

    fn claim_marker(&self, will_id: &str, user_id: &str, kind: NotificationCategory, now: DateTime<Utc>) -> bool {
        self.store
            .claim_will_user_reminder(will_id, user_id, kind, now)
            .unwrap_or_else(|e| {
                warn!(will_id = %will_id, user_id = %user_id, category = %kind, error = %e, "marker claim failed");
                false
            })
    }

    fn claim_commitment(&self, c: &Commitment, stamp: CommitmentStamp, now: DateTime<Utc>) -> bool {
        self.store
            .claim_commitment_stamp(&c.id, stamp, now)
            .unwrap_or_else(|e| {
                warn!(commitment_id = %c.id, ?stamp, error = %e, "commitment claim failed");
                false
            })
    }

    /// Claim the user's slot for the local date `today`.
    fn claim_daily(
        &self,
        user: &User,
        category: NotificationCategory,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> bool {
        match self.store.claim_daily(&user.id, category, today, now) {
            Ok(won) => {
                if !won {
                    debug!(user_id = %user.id, category = %category, %today, "already sent today");
                }
                won
            }
            Err(e) => {
                warn!(user_id = %user.id, category = %category, error = %e, "daily claim failed");
                false
            }
        }
    }

    fn participant(&self, will: &Will, c: &Commitment) -> Option<User> {
        match self.store.get_user(&c.user_id) {
            Ok(Some(u)) => Some(u),
            Ok(None) => {
                warn!(will_id = %will.id, user_id = %c.user_id, "commitment references unknown user, skipping");
                None
            }
            Err(e) => {
                warn!(will_id = %will.id, user_id = %c.user_id, error = %e, "could not load participant");
                None
            }
        }
    }
}

/// Commitment time, else the will's check-in time, else its reminder time.
fn check_in_target<'a>(will: &'a Will, c: &'a Commitment) -> Option<&'a str> {
    c.check_in_time
        .as_deref()
        .or(will.check_in_time.as_deref())
        .or(will.reminder_time.as_deref())
}
