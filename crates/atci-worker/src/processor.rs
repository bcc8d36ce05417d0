//! The processor loop.
//!
//! Every ~2 s, if the `currently_processing` slot is set, the job runs
//! to completion inside that tick; the slot is cleared afterwards in
//! every disposition and the index is refreshed. One job per tick, no
//! parallelism: the processor is the only clearer.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use atci_media::ToolRunner;
use atci_models::{parse_part, AtciConfig, Job, ProcessType};
use atci_queue::{CancelRegistry, Queue, QueueError};
use atci_store::Db;

use crate::error::{WorkerError, WorkerResult};
use crate::{hooks, partial, parts, pipeline};

/// Run the processor loop until shutdown flips.
pub async fn run_processor(
    db: Arc<Db>,
    queue: Queue,
    cancel: Arc<CancelRegistry>,
    mut shutdown: watch::Receiver<bool>,
) {
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
                tick(&db, &queue, &cancel).await;
            }
        }
    }
    debug!("processor loop stopped");
}

/// One processor tick: drive the current job, if any, to completion.
async fn tick(db: &Arc<Db>, queue: &Queue, cancel: &Arc<CancelRegistry>) {
    let current = match queue.peek_current() {
        Ok(Some(current)) => current,
        Ok(None) => return,
        Err(e) => {
            warn!("failed to read processing slot: {e}");
            return;
        }
    };

    let cfg = match AtciConfig::load().and_then(|cfg| {
        cfg.validate()?;
        Ok(cfg)
    }) {
        Ok(cfg) => cfg,
        Err(e) => {
            // Job not started; it stays current until the config is fixed.
            warn!("configuration incomplete, job not started: {e}");
            return;
        }
    };

    let job = current.job;
    let job_id = Uuid::new_v4();
    info!(
        %job_id,
        "processing {:?} job for {}",
        job.process_type,
        job.path.display()
    );

    let cancel_rx = cancel.register();
    let runner = ToolRunner::with_cancel(cancel_rx);
    let result = execute_job(&cfg, db, queue, &job, &runner).await;
    cancel.clear();

    match &result {
        Ok(()) => {
            info!(%job_id, "job finished for {}", job.path.display());
            clear_slot(queue);
            hooks::run_hook(&cfg.processing_success_command, &job.path).await;
        }
        Err(e) if e.is_cancelled() => {
            info!(%job_id, "job cancelled for {}", job.path.display());
            pipeline::cleanup_job_temps(&job.path);
            // cancel-current usually already emptied the slot.
            clear_slot(queue);
        }
        Err(e) => {
            error!(%job_id, "job failed for {}: {e}", job.path.display());
            pipeline::cleanup_job_temps(&job.path);
            clear_slot(queue);
            hooks::run_hook(&cfg.processing_failure_command, &job.path).await;
        }
    }

    refresh_index(db, &cfg).await;
}

/// Clear the processing slot, tolerating a slot already emptied by
/// cancel-current.
fn clear_slot(queue: &Queue) {
    match queue.clear_current() {
        Ok(()) => {}
        Err(QueueError::NotProcessing) => debug!("processing slot already cleared"),
        Err(e) => warn!("failed to clear processing slot: {e}"),
    }
}

/// Execute one job according to its process type.
async fn execute_job(
    cfg: &AtciConfig,
    db: &Arc<Db>,
    queue: &Queue,
    job: &Job,
    runner: &ToolRunner,
) -> WorkerResult<()> {
    match job.process_type {
        ProcessType::All => {
            if let Some(part) = parse_part(&job.path) {
                return parts::process_part(cfg, db, queue, &job.path, &part, runner).await;
            }
            pipeline::create_transcript(cfg, &job.path, runner).await?;
            pipeline::capture_length(cfg, &job.path).await?;
            Ok(())
        }
        ProcessType::Length => {
            pipeline::capture_length(cfg, &job.path).await?;
            Ok(())
        }
        ProcessType::Partial => {
            let time = job
                .time
                .as_deref()
                .ok_or_else(|| WorkerError::internal("partial job without a time"))?;
            partial::reprocess_from(cfg, &job.path, time, runner).await
        }
    }
}

/// Rebuild the video index from disk; the index is only a mirror, so
/// failures are logged and the next job tries again.
async fn refresh_index(db: &Arc<Db>, cfg: &AtciConfig) {
    let db = Arc::clone(db);
    let roots = cfg.watch_directories.clone();
    let result = tokio::task::spawn_blocking(move || db.rebuild_index(&roots)).await;
    match result {
        Ok(Ok(count)) => debug!("video index refreshed ({count} rows)"),
        Ok(Err(e)) => warn!("index rebuild failed: {e}"),
        Err(e) => warn!("index rebuild panicked: {e}"),
    }
}

/// Drive a single job synchronously (used by integration tests and the
/// startup catch-up path).
pub async fn process_one(
    cfg: &AtciConfig,
    db: &Arc<Db>,
    queue: &Queue,
    job: &Job,
) -> WorkerResult<()> {
    let runner = ToolRunner::new();
    execute_job(cfg, db, queue, job, &runner).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use atci_models::Job;

    #[tokio::test]
    async fn test_partial_without_time_is_rejected() {
        let db = Arc::new(Db::open_in_memory().unwrap());
        let queue = Queue::new(Arc::clone(&db));
        let cfg = AtciConfig::default();
        let mut job = Job::partial("/v/a.mp4", "00:05:00");
        job.time = None;

        let err = process_one(&cfg, &db, &queue, &job).await.unwrap_err();
        assert!(matches!(err, WorkerError::Internal(_)));
    }
}
