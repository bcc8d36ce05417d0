//! Database handle and schema management.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use tracing::info;

use crate::error::{StoreError, StoreResult};

/// Current schema version. Older databases migrate forward on open;
/// newer ones refuse startup.
pub const SCHEMA_VERSION: i64 = 2;

/// Shared handle over the embedded database.
///
/// All access funnels through one connection behind a mutex; every
/// operation is a short transaction, which is what makes the queue's
/// compare-and-set transitions atomic for concurrent readers.
#[derive(Debug)]
pub struct Db {
    conn: Mutex<Connection>,
}

impl Db {
    /// Open (and migrate) the database at `path`, creating parents.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        // journal_mode returns the resulting mode as a row.
        let _: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (tests).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run a closure with the locked connection.
    pub fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<T, rusqlite::Error>,
    ) -> StoreResult<T> {
        let mut guard = self.lock();
        Ok(f(&mut guard)?)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn init_schema(conn: &Connection) -> StoreResult<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS queue (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                process_type TEXT NOT NULL,
                path TEXT NOT NULL,
                time TEXT
            );
            CREATE TABLE IF NOT EXISTS currently_processing (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                process_type TEXT NOT NULL,
                path TEXT NOT NULL,
                time TEXT,
                started_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS video_info (
                logical_name TEXT NOT NULL,
                path TEXT PRIMARY KEY,
                ctime INTEGER NOT NULL,
                transcript_present INTEGER NOT NULL,
                transcript_line_count INTEGER NOT NULL,
                transcript_mtime INTEGER,
                length TEXT,
                source TEXT
            );
            CREATE TABLE IF NOT EXISTS video_parts (
                base_name TEXT NOT NULL,
                part_number INTEGER NOT NULL,
                source_path TEXT NOT NULL UNIQUE,
                processed_at TEXT NOT NULL,
                transcript_length INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (base_name, part_number)
            );",
        )?;

        let version: Option<i64> = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;

        match version {
            None => {
                conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [SCHEMA_VERSION])?;
            }
            Some(v) if v == SCHEMA_VERSION => {}
            Some(v) if v < SCHEMA_VERSION => {
                Self::migrate(conn, v)?;
            }
            Some(v) => {
                return Err(StoreError::SchemaVersion {
                    found: v,
                    supported: SCHEMA_VERSION,
                });
            }
        }

        Ok(())
    }

    fn migrate(conn: &Connection, from: i64) -> StoreResult<()> {
        info!("migrating database schema from v{from} to v{SCHEMA_VERSION}");
        if from < 2 {
            // v1 predates part transcript accounting.
            let has_column = conn
                .prepare("SELECT transcript_length FROM video_parts LIMIT 0")
                .is_ok();
            if !has_column {
                conn.execute_batch(
                    "ALTER TABLE video_parts ADD COLUMN transcript_length INTEGER NOT NULL DEFAULT 0;",
                )?;
            }
        }
        conn.execute("UPDATE schema_version SET version = ?1", [SCHEMA_VERSION])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_schema() {
        let db = Db::open_in_memory().unwrap();
        let version: i64 = db
            .with_conn(|c| c.query_row("SELECT version FROM schema_version", [], |r| r.get(0)))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_open_on_disk_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state/atci.db");
        {
            let db = Db::open(&path).unwrap();
            db.with_conn(|c| {
                c.execute(
                    "INSERT INTO queue (process_type, path) VALUES ('all', '/v/a.mp4')",
                    [],
                )
            })
            .unwrap();
        }
        let db = Db::open(&path).unwrap();
        let count: i64 = db
            .with_conn(|c| c.query_row("SELECT COUNT(*) FROM queue", [], |r| r.get(0)))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_newer_schema_refuses_startup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("atci.db");
        {
            let db = Db::open(&path).unwrap();
            db.with_conn(|c| {
                c.execute("UPDATE schema_version SET version = ?1", [SCHEMA_VERSION + 1])
            })
            .unwrap();
        }
        match Db::open(&path) {
            Err(StoreError::SchemaVersion { found, .. }) => {
                assert_eq!(found, SCHEMA_VERSION + 1);
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_v1_database_migrates_forward() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("atci.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE schema_version (version INTEGER NOT NULL);
                INSERT INTO schema_version (version) VALUES (1);
                CREATE TABLE video_parts (
                    base_name TEXT NOT NULL,
                    part_number INTEGER NOT NULL,
                    source_path TEXT NOT NULL UNIQUE,
                    processed_at TEXT NOT NULL,
                    PRIMARY KEY (base_name, part_number)
                );",
            )
            .unwrap();
        }
        let db = Db::open(&path).unwrap();
        let version: i64 = db
            .with_conn(|c| c.query_row("SELECT version FROM schema_version", [], |r| r.get(0)))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
        // Migrated column is usable.
        db.with_conn(|c| {
            c.execute(
                "INSERT INTO video_parts (base_name, part_number, source_path, processed_at, transcript_length)
                 VALUES ('s', 1, '/v/s.part1.mkv', 'now', 12)",
                [],
            )
        })
        .unwrap();
    }
}
