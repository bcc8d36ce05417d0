//! Service binary: discovery loop, processor loop and the HTTP API in
//! one process.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use atci_api::{create_router, AppState};
use atci_models::AtciConfig;
use atci_queue::{CancelRegistry, Queue};
use atci_store::Db;
use atci_worker::{run_discovery, run_processor};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    info!("starting atci");

    // A broken configuration is not fatal: the API serves 503s and the
    // loops idle until the file is fixed.
    match AtciConfig::load() {
        Ok(cfg) => {
            if let Err(e) = cfg.validate() {
                warn!("configuration incomplete: {e}");
            }
        }
        Err(e) => warn!("failed to load configuration: {e}"),
    }

    let db_path = AtciConfig::data_dir()
        .context("no home directory for ~/.atci")?
        .join("atci.db");
    let db = Arc::new(Db::open(&db_path).context("failed to open database")?);

    let queue = Queue::new(Arc::clone(&db));
    queue
        .recover_startup()
        .context("failed to recover queue state")?;

    let cancel = Arc::new(CancelRegistry::new());

    // Prime the index before the first request hits it.
    if let Ok(cfg) = AtciConfig::load() {
        if cfg.validate().is_ok() {
            let db_init = Arc::clone(&db);
            let roots = cfg.watch_directories.clone();
            if let Err(e) =
                tokio::task::spawn_blocking(move || db_init.rebuild_index(&roots)).await?
            {
                warn!("initial index rebuild failed: {e}");
            }
        }
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let discovery_handle = tokio::spawn(run_discovery(queue.clone(), shutdown_rx.clone()));
    let processor_handle = tokio::spawn(run_processor(
        Arc::clone(&db),
        queue.clone(),
        Arc::clone(&cancel),
        shutdown_rx.clone(),
    ));

    let state = AppState::new(Arc::clone(&db), queue.clone(), Arc::clone(&cancel));
    let app = create_router(state);

    let host = std::env::var("ATCI_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("ATCI_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8000);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .context("invalid bind address")?;
    info!("listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind")?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown_tx))
    .await
    .context("server error")?;

    // Let the current job drain; past the grace period its cancel token
    // fires and the loops wind down on their own.
    let drain = async {
        let _ = discovery_handle.await;
        let _ = processor_handle.await;
    };
    if tokio::time::timeout(std::time::Duration::from_secs(30), drain)
        .await
        .is_err()
    {
        warn!("current job still running, signalling cancellation");
        cancel.cancel();
    }

    info!("shutdown complete");
    Ok(())
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive(
        "atci=info"
            .parse()
            .expect("static directive always parses"),
    );

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C handler");
    info!("received shutdown signal, stopping loops");
    // Discovery stops promoting; the processor finishes or cancels its
    // current job on its own schedule.
    let _ = shutdown_tx.send(true);
}
