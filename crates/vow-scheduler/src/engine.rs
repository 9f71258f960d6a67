use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};
use vow_core::config::SchedulerConfig;
use vow_notify::NotificationTransport;
use vow_rooms::RoomProvider;
use vow_store::Store;

use crate::lifecycle::{LifecycleDriver, TransitionReport};
use crate::notifications::{NotificationScheduler, NotificationTally};
use crate::session::SessionCoordinator;

/// What one tick did. Logged by the loop, asserted on by tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub sessions_opened: usize,
    pub sessions_closed: usize,
    pub transitions: TransitionReport,
    pub notifications: NotificationTally,
}

/// Drives the whole lifecycle from two periodic ticks.
///
/// The heavy tick opens and closes sessions, advances statuses and sends
/// most notifications. The light tick only sends the pre-session warnings,
/// so they are not delayed behind a slow heavy tick. Ticks may overlap,
/// with each other or with another process on the same database; every
/// write they make is conditional, so that is safe.
pub struct SchedulerEngine {
    cfg: SchedulerConfig,
    lifecycle: LifecycleDriver,
    sessions: SessionCoordinator,
    notifications: NotificationScheduler,
}

impl SchedulerEngine {
    pub fn new(
        store: Store,
        transport: Arc<dyn NotificationTransport>,
        rooms: Arc<dyn RoomProvider>,
        cfg: SchedulerConfig,
        provider_timeout: Duration,
    ) -> Self {
        let lifecycle = LifecycleDriver::new(store.clone(), cfg.batch_limit);
        let sessions = SessionCoordinator::new(
            store.clone(),
            rooms,
            Arc::clone(&transport),
            lifecycle.clone(),
            cfg.session_duration_minutes,
            provider_timeout,
            cfg.batch_limit,
        );
        let notifications = NotificationScheduler::new(store, transport, cfg.clone());
        Self {
            cfg,
            lifecycle,
            sessions,
            notifications,
        }
    }

    /// Session open, session close (which re-checks completion), status
    /// transitions, then the heavy notification categories.
    ///
    /// A failing step is logged and the remaining steps still run.
    pub async fn heavy_tick(&self, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::default();

        match self.sessions.open_due(now).await {
            Ok(n) => report.sessions_opened = n,
            Err(e) => error!(error = %e, "session open pass failed"),
        }
        match self.sessions.close_due(now).await {
            Ok(n) => report.sessions_closed = n,
            Err(e) => error!(error = %e, "session close pass failed"),
        }
        match self.lifecycle.run_transitions(now) {
            Ok(t) => report.transitions = t,
            Err(e) => error!(error = %e, "transition pass failed"),
        }
        report.notifications = self.notifications.run_heavy(now).await;
        report
    }

    pub async fn light_tick(&self, now: DateTime<Utc>) -> TickReport {
        TickReport {
            notifications: self.notifications.run_light(now).await,
            ..TickReport::default()
        }
    }

    /// Run both ticks until `shutdown` broadcasts `true`, then wait for any
    /// tick still in flight.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(
            heavy_secs = self.cfg.heavy_interval_secs,
            light_secs = self.cfg.light_interval_secs,
            "scheduler engine started"
        );

        let mut heavy = tokio::time::interval(Duration::from_secs(self.cfg.heavy_interval_secs.max(1)));
        let mut light = tokio::time::interval(Duration::from_secs(self.cfg.light_interval_secs.max(1)));
        heavy.set_missed_tick_behavior(MissedTickBehavior::Skip);
        light.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut in_flight = JoinSet::new();
        loop {
            tokio::select! {
                _ = heavy.tick() => {
                    let engine = Arc::clone(&self);
                    in_flight.spawn(async move {
                        let report = engine.heavy_tick(Utc::now()).await;
                        debug!(?report, "heavy tick done");
                    });
                }
                _ = light.tick() => {
                    let engine = Arc::clone(&self);
                    in_flight.spawn(async move {
                        let report = engine.light_tick(Utc::now()).await;
                        debug!(?report, "light tick done");
                    });
                }
                changed = shutdown.changed() => {
                    // A dropped sender also means stop.
                    if changed.is_err() || *shutdown.borrow() {
                        info!("scheduler engine shutting down");
                        break;
                    }
                }
            }
            while let Some(done) = in_flight.try_join_next() {
                if let Err(e) = done {
                    error!(error = %e, "tick task panicked");
                }
            }
        }

        while let Some(done) = in_flight.join_next().await {
            if let Err(e) = done {
                error!(error = %e, "tick task panicked");
            }
        }
        info!("scheduler engine stopped");
    }
}
