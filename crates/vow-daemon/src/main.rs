use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use vow_core::config::VowConfig;
use vow_notify::{LogTransport, NotificationTransport, WebhookTransport};
use vow_rooms::{DailyRoomProvider, DisabledRoomProvider, RoomProvider};
use vow_scheduler::SchedulerEngine;
use vow_store::Store;

#[derive(Parser)]
#[command(name = "vow-daemon")]
#[command(about = "Lifecycle scheduler for commitment cycles")]
struct Cli {
    /// Path to the TOML config (falls back to VOW_CONFIG, then ~/.vow/vow.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// SQLite database path (overrides config)
    #[arg(long)]
    db: Option<String>,

    /// Run one heavy and one light tick, then exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vow_daemon=info,vow_scheduler=info".into()),
        )
        .init();

    let cli = Cli::parse();

    // explicit flag > VOW_CONFIG env > ~/.vow/vow.toml
    let config_path = cli.config.clone().or_else(|| std::env::var("VOW_CONFIG").ok());
    let mut config = VowConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!(code = e.code(), "Config load failed ({}), using defaults", e);
        VowConfig::default()
    });
    if let Some(db) = cli.db {
        config.database.path = db;
    }

    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");
    let store = Store::open(db_path)?;

    let migrated = store.migrate_legacy_statuses(chrono::Utc::now())?;
    info!(migrated, "database ready");

    let transport = build_transport(&config);
    let rooms = build_rooms(&config);
    let engine = Arc::new(SchedulerEngine::new(
        store,
        transport,
        rooms,
        config.scheduler.clone(),
        config.provider_timeout(),
    ));

    if cli.once {
        let now = chrono::Utc::now();
        let heavy = engine.heavy_tick(now).await;
        let light = engine.light_tick(now).await;
        info!(?heavy, ?light, "single run complete");
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let runner = tokio::spawn(Arc::clone(&engine).run(shutdown_rx));

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received, stopping scheduler");
    let _ = shutdown_tx.send(true);
    runner.await?;
    Ok(())
}

/// Webhook push if configured, otherwise log-only.
fn build_transport(config: &VowConfig) -> Arc<dyn NotificationTransport> {
    if let Some(ref push) = config.push {
        match WebhookTransport::from_config(push) {
            Ok(t) => {
                info!(url = %push.webhook_url, "push webhook transport enabled");
                return Arc::new(t);
            }
            Err(e) => warn!(error = %e, "push transport misconfigured, falling back to log"),
        }
    }
    info!("no push transport configured, notifications are logged only");
    Arc::new(LogTransport::new())
}

/// Daily.co-compatible provider if configured, otherwise sessions open without rooms.
fn build_rooms(config: &VowConfig) -> Arc<dyn RoomProvider> {
    if let Some(ref rooms) = config.rooms {
        match DailyRoomProvider::from_config(rooms) {
            Ok(p) => {
                info!(base_url = %rooms.base_url, "video room provider enabled");
                return Arc::new(p);
            }
            Err(e) => warn!(error = %e, "room provider misconfigured, sessions will have no url"),
        }
    }
    Arc::new(DisabledRoomProvider)
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
