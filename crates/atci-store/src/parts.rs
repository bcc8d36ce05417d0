//! Processed-part records.
//!
//! The set of processed parts per base is monotone: rows are only ever
//! added (or refreshed), never removed by the pipeline, which is what
//! lets the assembler's precondition check stay a simple lookup.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::db::Db;
use crate::error::StoreResult;

/// One processed part.
#[derive(Debug, Clone)]
pub struct PartRecord {
    pub base_name: String,
    pub part_number: u32,
    pub source_path: PathBuf,
    pub processed_at: DateTime<Utc>,
    pub transcript_length: i64,
}

impl Db {
    /// Whether part `n` of `base` is recorded as processed.
    pub fn is_part_processed(&self, base: &str, n: u32) -> StoreResult<bool> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM video_parts WHERE base_name = ?1 AND part_number = ?2)",
                params![base, n],
                |row| row.get(0),
            )
        })
    }

    /// All processed part numbers for `base`, ascending.
    pub fn processed_parts(&self, base: &str) -> StoreResult<Vec<u32>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT part_number FROM video_parts WHERE base_name = ?1 ORDER BY part_number",
            )?;
            let rows = stmt.query_map([base], |row| row.get(0))?;
            rows.collect()
        })
    }

    /// Part numbers in `1..=up_to` not yet recorded as processed.
    pub fn missing_parts(&self, base: &str, up_to: u32) -> StoreResult<Vec<u32>> {
        let processed = self.processed_parts(base)?;
        Ok((1..=up_to).filter(|n| !processed.contains(n)).collect())
    }

    /// Record (or refresh) a processed part.
    pub fn record_part(&self, record: &PartRecord) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO video_parts
                 (base_name, part_number, source_path, processed_at, transcript_length)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.base_name,
                    record.part_number,
                    record.source_path.to_string_lossy(),
                    record.processed_at.to_rfc3339(),
                    record.transcript_length,
                ],
            )?;
            Ok(())
        })
    }

    /// Number of recorded parts for `base`.
    pub fn part_count(&self, base: &str) -> StoreResult<i64> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM video_parts WHERE base_name = ?1",
                [base],
                |row| row.get(0),
            )
        })
    }
}
