//! The `video_info` index: a fast mirror of on-disk truth.
//!
//! Disk always wins; the whole table is rebuilt from the watch roots
//! after every job and at startup.

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use rusqlite::params;
use serde::Serialize;
use tracing::debug;
use walkdir::WalkDir;

use atci_models::{is_video_path, logical_name, sidecar};

use crate::db::Db;
use crate::error::StoreResult;
use crate::meta;

/// One row of the index.
#[derive(Debug, Clone, Serialize)]
pub struct VideoRecord {
    pub logical_name: String,
    pub path: PathBuf,
    pub ctime: i64,
    pub transcript_present: bool,
    pub transcript_line_count: i64,
    pub transcript_mtime: Option<i64>,
    pub length: Option<String>,
    pub source: Option<String>,
}

fn file_ctime(path: &Path) -> i64 {
    std::fs::metadata(path)
        .ok()
        .and_then(|m| m.created().or_else(|_| m.modified()).ok())
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn file_mtime(path: &Path) -> Option<i64> {
    std::fs::metadata(path)
        .ok()
        .and_then(|m| m.modified().ok())
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
}

/// Build the index row for one video by reading its sidecars.
fn record_for(root: &Path, video: &Path) -> Option<VideoRecord> {
    let logical = logical_name(root, video)?;
    let txt = sidecar(video, "txt");
    let meta_map = meta::read_meta(&sidecar(video, "meta")).unwrap_or_default();

    let (present, line_count, mtime) = if txt.is_file() {
        let lines = std::fs::read_to_string(&txt)
            .map(|c| c.lines().count() as i64)
            .unwrap_or(0);
        (true, lines, file_mtime(&txt))
    } else {
        (false, 0, None)
    };

    Some(VideoRecord {
        logical_name: logical,
        path: video.to_path_buf(),
        ctime: file_ctime(video),
        transcript_present: present,
        transcript_line_count: line_count,
        transcript_mtime: mtime,
        length: meta_map.get("length").cloned(),
        source: meta_map.get("source").cloned(),
    })
}

impl Db {
    /// Rebuild the whole index by scanning the watch roots.
    pub fn rebuild_index(&self, roots: &[PathBuf]) -> StoreResult<usize> {
        let mut records = Vec::new();
        for root in roots {
            for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
                if !entry.file_type().is_file() || !is_video_path(entry.path()) {
                    continue;
                }
                if let Some(record) = record_for(root, entry.path()) {
                    records.push(record);
                }
            }
        }

        let count = records.len();
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM video_info", [])?;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR REPLACE INTO video_info
                     (logical_name, path, ctime, transcript_present, transcript_line_count,
                      transcript_mtime, length, source)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )?;
                for r in &records {
                    stmt.execute(params![
                        r.logical_name,
                        r.path.to_string_lossy(),
                        r.ctime,
                        r.transcript_present,
                        r.transcript_line_count,
                        r.transcript_mtime,
                        r.length,
                        r.source,
                    ])?;
                }
            }
            tx.commit()
        })?;

        debug!("rebuilt video index with {count} rows");
        Ok(count)
    }

    /// List all indexed videos, ordered by logical name.
    pub fn list_videos(&self) -> StoreResult<Vec<VideoRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT logical_name, path, ctime, transcript_present, transcript_line_count,
                        transcript_mtime, length, source
                 FROM video_info ORDER BY logical_name",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(VideoRecord {
                    logical_name: row.get(0)?,
                    path: PathBuf::from(row.get::<_, String>(1)?),
                    ctime: row.get(2)?,
                    transcript_present: row.get(3)?,
                    transcript_line_count: row.get(4)?,
                    transcript_mtime: row.get(5)?,
                    length: row.get(6)?,
                    source: row.get(7)?,
                })
            })?;
            rows.collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebuild_index_reflects_disk() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        std::fs::write(root.join("a.mp4"), b"v").unwrap();
        std::fs::write(root.join("a.txt"), "00:00:00.000 --> 00:00:01.000\nhi\n").unwrap();
        std::fs::write(root.join("a.meta"), "length: 00:10:00\nsource: subtitles\n").unwrap();
        std::fs::write(root.join("b.mkv"), b"v").unwrap();
        std::fs::write(root.join("notes.txt"), b"not a video").unwrap();

        let db = Db::open_in_memory().unwrap();
        let count = db.rebuild_index(&[root]).unwrap();
        assert_eq!(count, 2);

        let videos = db.list_videos().unwrap();
        assert_eq!(videos.len(), 2);
        let a = videos.iter().find(|v| v.logical_name == "a").unwrap();
        assert!(a.transcript_present);
        assert_eq!(a.transcript_line_count, 2);
        assert_eq!(a.length.as_deref(), Some("00:10:00"));
        assert_eq!(a.source.as_deref(), Some("subtitles"));

        let b = videos.iter().find(|v| v.logical_name == "b").unwrap();
        assert!(!b.transcript_present);
        assert_eq!(b.length, None);
    }

    #[test]
    fn test_rebuild_replaces_stale_rows() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let video = root.join("gone.mp4");
        std::fs::write(&video, b"v").unwrap();

        let db = Db::open_in_memory().unwrap();
        db.rebuild_index(std::slice::from_ref(&root)).unwrap();
        assert_eq!(db.list_videos().unwrap().len(), 1);

        std::fs::remove_file(&video).unwrap();
        db.rebuild_index(std::slice::from_ref(&root)).unwrap();
        assert!(db.list_videos().unwrap().is_empty());
    }
}
