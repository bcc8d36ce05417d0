//! The discovery loop.
//!
//! Every ~2 s: enumerate the watch roots, enqueue an `all` job for every
//! video missing its transcript, then promote the queue head when the
//! processing slot is free. Discovery is the only promoter.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};
use walkdir::WalkDir;

use atci_models::{is_video_path, sidecar, AtciConfig, Job};
use atci_queue::Queue;

use crate::error::{WorkerError, WorkerResult};

/// Scan all watch roots once and enqueue videos missing transcripts.
///
/// Roots are visited in configured order; within a root, paths sort
/// lexicographically so a directory's videos process as a contiguous
/// batch. Part files with missing predecessors are enqueued like any
/// other video; the assembler decides what happens to them.
///
/// Returns the number of jobs actually added.
pub fn scan_watch_roots(cfg: &AtciConfig, queue: &Queue) -> WorkerResult<usize> {
    let mut added = 0;
    for root in &cfg.watch_directories {
        let mut missing: Vec<PathBuf> = WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| is_video_path(p))
            .filter(|p| !sidecar(p, "txt").is_file())
            .collect();
        missing.sort();

        for path in missing {
            if queue.enqueue(&Job::all(path))? {
                added += 1;
            }
        }
    }
    Ok(added)
}

/// One discovery tick: scan, then promote when idle.
fn tick(queue: &Queue) -> WorkerResult<()> {
    let cfg = AtciConfig::load()?;
    if let Err(e) = cfg.validate() {
        debug!("discovery idle, configuration incomplete: {e}");
        return Ok(());
    }

    let added = scan_watch_roots(&cfg, queue)?;
    if added > 0 {
        debug!("discovery enqueued {added} job(s)");
    }

    // promote_head is a no-op while a job is in flight.
    queue.promote_head()?;
    Ok(())
}

/// Run the discovery loop until shutdown flips.
pub async fn run_discovery(queue: Queue, mut shutdown: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(Duration::from_secs(2));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = interval.tick() => {
                let q = queue.clone();
                let result = tokio::task::spawn_blocking(move || tick(&q))
                    .await
                    .map_err(|e| WorkerError::internal(e.to_string()))
                    .and_then(|r| r);
                if let Err(e) = result {
                    warn!("discovery tick failed: {e}");
                }
            }
        }
    }
    debug!("discovery loop stopped");
}
