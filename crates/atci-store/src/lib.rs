//! Durable state for the transcription service.
//!
//! Two layers of truth live here:
//! - `.meta` sidecar files beside each video, the authoritative per-video
//!   key/value store
//! - a sqlite database under `~/.atci/` holding the queue tables, the
//!   `video_info` index (a rebuildable mirror of disk) and `video_parts`
//!   records

pub mod db;
pub mod error;
pub mod index;
pub mod meta;
pub mod parts;

pub use db::{Db, SCHEMA_VERSION};
pub use error::{StoreError, StoreResult};
pub use index::VideoRecord;
pub use parts::PartRecord;
