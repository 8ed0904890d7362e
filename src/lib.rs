pub mod classifier;
pub mod cli;
pub mod db;
pub mod drift;
pub mod effects;
pub mod error;
pub mod host;
pub mod messages;
pub mod models;
pub mod policy;
pub mod scheduler;
pub mod session;
pub mod settings;
pub mod store;
mod utils;

use std::sync::Arc;

use anyhow::Result;
use log::{info, warn};
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

use cli::Args;
use db::Database;
use effects::Outbox;
use host::{HostBridge, HostOutput};
use policy::PolicySync;
use scheduler::{SystemClock, TokioScheduler};
use session::FocusController;
use settings::SettingsStore;
use store::{KeyValueStore, MemoryStore, StateRepository};

pub async fn run(args: Args) -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    info!("focus-guard starting up...");

    let settings_store = SettingsStore::new(args.resolved_settings())?;
    let settings = settings_store.settings().apply_env();

    let store: Arc<dyn KeyValueStore> = if args.memory {
        warn!("Running with in-memory state; nothing will persist");
        Arc::new(MemoryStore::new())
    } else {
        let db_path = args.resolved_data_dir().join("focus-guard.sqlite3");
        Arc::new(Database::new(db_path)?)
    };
    let repo = StateRepository::new(store).with_history_cap(settings.history_cap);

    let (host_output, frames) = HostOutput::channel();
    let (outbox, effects) = Outbox::channel();
    let engine = Arc::new(HostBridge::new(host_output.clone(), settings.policy.max_rules));
    let policy = PolicySync::new(engine, settings.policy.clone());

    let shutdown = CancellationToken::new();
    let writer = tokio::spawn(host::write_frames(
        tokio::io::stdout(),
        frames,
        effects,
        shutdown.clone(),
    ));

    let controller = FocusController::new(
        repo,
        policy,
        Arc::new(TokioScheduler),
        Arc::new(SystemClock),
        outbox,
        settings,
    );

    // Finish sessions that ran out while the process was down.
    controller.recover().await?;
    let watcher = controller.spawn_store_watcher(shutdown.clone());

    let served = host::read_requests(
        &controller,
        BufReader::new(tokio::io::stdin()),
        &host_output,
        &shutdown,
    )
    .await;

    shutdown.cancel();
    if let Err(err) = watcher.await {
        warn!("Store watcher exited abnormally: {err}");
    }
    match writer.await {
        Ok(Err(err)) => warn!("Host writer failed: {err:#}"),
        Err(err) => warn!("Host writer exited abnormally: {err}"),
        Ok(Ok(())) => {}
    }

    info!("focus-guard shutting down");
    served
}
