//! Shared data models for the atci transcription service.
//!
//! This crate provides the pure, dependency-light core of the service:
//! - Configuration snapshot loaded from `~/.atciconfig`
//! - Video identity, sidecar paths and the extension allow-list
//! - Multi-part file name grammar (`basename.partN.ext`)
//! - Transcript block grammar, SRT/VTT conversion and timestamp math
//! - Queue job types

pub mod config;
pub mod job;
pub mod part;
pub mod timestamp;
pub mod transcript;
pub mod video;

pub use config::{AtciConfig, ConfigError};
pub use job::{Job, ProcessType};
pub use part::{parse_part, MasterPaths, PartName};
pub use timestamp::{format_seconds_hms, format_seconds_millis, parse_timestamp, TimestampError};
pub use video::{content_type_for, find_video, is_video_path, logical_name, sidecar, VIDEO_EXTENSIONS};
