//! Service configuration.
//!
//! The configuration is a read-only snapshot of `~/.atciconfig` (JSON).
//! Callers re-load it at the top of each periodic tick, so edits to the
//! file take effect without a restart.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine home directory")]
    NoHomeDir,

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("no watch directories configured")]
    NoWatchDirectories,

    #[error("watch directories nest: {outer} contains {inner}")]
    NestedWatchDirectories { outer: PathBuf, inner: PathBuf },

    #[error("required tool path is not configured: {0}")]
    MissingToolPath(&'static str),

    #[error("no speech-to-text model configured")]
    MissingModel,
}

/// Snapshot of the service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AtciConfig {
    /// Ordered list of directory trees scanned for videos.
    pub watch_directories: Vec<PathBuf>,
    /// Path to the whisper CLI binary.
    pub whispercli_path: String,
    /// Path to the ffmpeg binary.
    pub ffmpeg_path: String,
    /// Path to the ffprobe binary.
    pub ffprobe_path: String,
    /// Stem of a model file under `~/.atci/models/`.
    pub model_name: String,
    /// Explicit model file path; wins over `model_name` when non-empty.
    pub model_path: String,
    /// Shared password for non-loopback requests; empty disables the gate.
    pub password: String,
    /// Whether the speech-to-text path may run.
    pub allow_whisper: bool,
    /// Whether embedded subtitles may be extracted.
    pub allow_subtitles: bool,
    /// Shell command run after a job succeeds; video path piped on stdin.
    pub processing_success_command: String,
    /// Shell command run after a job fails; video path piped on stdin.
    pub processing_failure_command: String,
    /// Chunk size in seconds for the stream-download helper.
    pub stream_chunk_size: u32,
}

impl Default for AtciConfig {
    fn default() -> Self {
        Self {
            watch_directories: Vec::new(),
            whispercli_path: String::new(),
            ffmpeg_path: String::new(),
            ffprobe_path: String::new(),
            model_name: String::new(),
            model_path: String::new(),
            password: String::new(),
            allow_whisper: true,
            allow_subtitles: true,
            processing_success_command: String::new(),
            processing_failure_command: String::new(),
            stream_chunk_size: 60,
        }
    }
}

impl AtciConfig {
    /// Location of the configuration file.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|h| h.join(".atciconfig"))
            .ok_or(ConfigError::NoHomeDir)
    }

    /// Application data directory (`~/.atci`).
    pub fn data_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|h| h.join(".atci"))
            .ok_or(ConfigError::NoHomeDir)
    }

    /// Load the configuration snapshot from disk.
    ///
    /// A missing file yields the defaults; validation is separate so a
    /// half-configured install can still serve status endpoints.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load a snapshot from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validate the parts of the snapshot the processing core depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watch_directories.is_empty() {
            return Err(ConfigError::NoWatchDirectories);
        }
        for outer in &self.watch_directories {
            for inner in &self.watch_directories {
                if outer != inner && inner.starts_with(outer) {
                    return Err(ConfigError::NestedWatchDirectories {
                        outer: outer.clone(),
                        inner: inner.clone(),
                    });
                }
            }
        }
        if self.ffmpeg_path.is_empty() {
            return Err(ConfigError::MissingToolPath("ffmpeg_path"));
        }
        if self.ffprobe_path.is_empty() {
            return Err(ConfigError::MissingToolPath("ffprobe_path"));
        }
        Ok(())
    }

    /// Resolve the model file for the speech-to-text CLI.
    ///
    /// An explicit `model_path` wins; otherwise the model lives under
    /// `~/.atci/models/<model_name>.bin`.
    pub fn resolve_model_path(&self) -> Result<PathBuf, ConfigError> {
        if !self.model_path.is_empty() {
            return Ok(PathBuf::from(&self.model_path));
        }
        if self.model_name.is_empty() {
            return Err(ConfigError::MissingModel);
        }
        Ok(Self::data_dir()?
            .join("models")
            .join(format!("{}.bin", self.model_name)))
    }
}
