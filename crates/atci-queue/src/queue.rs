//! Queue operations over the embedded store.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info};

use atci_models::{Job, ProcessType};
use atci_store::Db;

use crate::cancel::CancelRegistry;
use crate::error::{QueueError, QueueResult};

/// The in-flight job.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentJob {
    #[serde(flatten)]
    pub job: Job,
    pub started_at: String,
}

/// Handle over the pending queue and the `currently_processing` slot.
#[derive(Clone)]
pub struct Queue {
    db: Arc<Db>,
}

fn row_to_job(process_type: String, path: String, time: Option<String>) -> Option<Job> {
    Some(Job {
        process_type: ProcessType::from_str(&process_type)?,
        path: PathBuf::from(path),
        time,
    })
}

fn job_in_pending(conn: &Connection, job: &Job) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM queue
         WHERE process_type = ?1 AND path = ?2 AND COALESCE(time, '') = COALESCE(?3, ''))",
        params![
            job.process_type.as_str(),
            job.path.to_string_lossy(),
            job.time
        ],
        |row| row.get(0),
    )
}

fn job_is_current(conn: &Connection, job: &Job) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM currently_processing
         WHERE process_type = ?1 AND path = ?2 AND COALESCE(time, '') = COALESCE(?3, ''))",
        params![
            job.process_type.as_str(),
            job.path.to_string_lossy(),
            job.time
        ],
        |row| row.get(0),
    )
}

impl Queue {
    /// Create a queue handle over the store.
    pub fn new(db: Arc<Db>) -> Self {
        Self { db }
    }

    /// Clear a stale `currently_processing` row left by a crash.
    ///
    /// The interrupted job is not re-enqueued; discovery re-finds it if
    /// its transcript is still missing.
    pub fn recover_startup(&self) -> QueueResult<()> {
        let cleared = self
            .db
            .with_conn(|conn| conn.execute("DELETE FROM currently_processing", []))?;
        if cleared > 0 {
            info!("cleared stale currently-processing entry from previous run");
        }
        Ok(())
    }

    /// Append a job unless an identical one is already pending or
    /// current. Returns whether the job was added.
    pub fn enqueue(&self, job: &Job) -> QueueResult<bool> {
        let added = self.db.with_conn(|conn| {
            let tx = conn.transaction()?;
            if job_in_pending(&tx, job)? || job_is_current(&tx, job)? {
                tx.commit()?;
                return Ok(false);
            }
            tx.execute(
                "INSERT INTO queue (process_type, path, time) VALUES (?1, ?2, ?3)",
                params![
                    job.process_type.as_str(),
                    job.path.to_string_lossy(),
                    job.time
                ],
            )?;
            tx.commit()?;
            Ok(true)
        })?;
        if added {
            debug!("enqueued {:?} {}", job.process_type, job.path.display());
        }
        Ok(added)
    }

    /// All pending jobs in queue order.
    pub fn pending(&self) -> QueueResult<Vec<Job>> {
        self.db
            .with_conn(|conn| {
                let mut stmt = conn
                    .prepare("SELECT process_type, path, time FROM queue ORDER BY id")?;
                let rows = stmt.query_map([], |row| {
                    Ok(row_to_job(row.get(0)?, row.get(1)?, row.get(2)?))
                })?;
                rows.collect::<Result<Vec<_>, _>>()
            })
            .map(|jobs| jobs.into_iter().flatten().collect())
            .map_err(Into::into)
    }

    /// The in-flight job, if any.
    pub fn peek_current(&self) -> QueueResult<Option<CurrentJob>> {
        let row = self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT process_type, path, time, started_at FROM currently_processing",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()
        })?;
        Ok(row.and_then(|(pt, path, time, started_at)| {
            Some(CurrentJob {
                job: row_to_job(pt, path, time)?,
                started_at,
            })
        }))
    }

    /// Atomically move the head of the pending queue into the
    /// `currently_processing` slot, iff the slot is empty.
    ///
    /// Only the discovery loop calls this.
    pub fn promote_head(&self) -> QueueResult<Option<Job>> {
        let promoted = self.db.with_conn(|conn| {
            let tx = conn.transaction()?;
            let occupied: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM currently_processing)",
                [],
                |row| row.get(0),
            )?;
            if occupied {
                tx.commit()?;
                return Ok(None);
            }
            let head = tx
                .query_row(
                    "SELECT id, process_type, path, time FROM queue ORDER BY id LIMIT 1",
                    [],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, Option<String>>(3)?,
                        ))
                    },
                )
                .optional()?;
            let Some((id, pt, path, time)) = head else {
                tx.commit()?;
                return Ok(None);
            };
            tx.execute(
                "INSERT INTO currently_processing (id, process_type, path, time, started_at)
                 VALUES (1, ?1, ?2, ?3, ?4)",
                params![pt, path, time, Utc::now().to_rfc3339()],
            )?;
            tx.execute("DELETE FROM queue WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok(row_to_job(pt, path, time))
        })?;
        if let Some(job) = &promoted {
            info!("promoted {} into processing", job.path.display());
        }
        Ok(promoted)
    }

    /// Empty the `currently_processing` slot.
    ///
    /// Only the processor calls this; errors when nothing is current.
    pub fn clear_current(&self) -> QueueResult<()> {
        let cleared = self
            .db
            .with_conn(|conn| conn.execute("DELETE FROM currently_processing", []))?;
        if cleared == 0 {
            return Err(QueueError::NotProcessing);
        }
        Ok(())
    }

    /// Remove a pending job; errors when it is not present.
    pub fn remove(&self, job: &Job) -> QueueResult<()> {
        let removed = self.db.with_conn(|conn| {
            conn.execute(
                "DELETE FROM queue
                 WHERE process_type = ?1 AND path = ?2 AND COALESCE(time, '') = COALESCE(?3, '')",
                params![
                    job.process_type.as_str(),
                    job.path.to_string_lossy(),
                    job.time
                ],
            )
        })?;
        if removed == 0 {
            return Err(QueueError::NotFound);
        }
        Ok(())
    }

    /// Replace the pending queue with a permutation of itself.
    pub fn reorder(&self, new_order: &[Job]) -> QueueResult<()> {
        let current = self.pending()?;
        let mut a: Vec<&Job> = current.iter().collect();
        let mut b: Vec<&Job> = new_order.iter().collect();
        let key = |j: &&Job| {
            (
                j.process_type.as_str(),
                j.path.to_string_lossy().to_string(),
                j.time.clone(),
            )
        };
        a.sort_by_key(key);
        b.sort_by_key(key);
        if a.len() != b.len() || a.iter().zip(&b).any(|(x, y)| x != y) {
            return Err(QueueError::SetMismatch);
        }

        self.db.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM queue", [])?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO queue (process_type, path, time) VALUES (?1, ?2, ?3)",
                )?;
                for job in new_order {
                    stmt.execute(params![
                        job.process_type.as_str(),
                        job.path.to_string_lossy(),
                        job.time
                    ])?;
                }
            }
            tx.commit()
        })?;
        Ok(())
    }

    /// Cancel the in-flight job: fire its token and clear the slot.
    ///
    /// The next pending entry is left untouched. Returns whether a job
    /// was actually cancelled.
    pub fn cancel_current(&self, cancel: &CancelRegistry) -> QueueResult<bool> {
        match self.peek_current()? {
            Some(current) => {
                info!("cancelling current job {}", current.job.path.display());
                cancel.cancel();
                self.clear_current()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
