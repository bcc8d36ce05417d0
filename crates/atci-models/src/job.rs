//! Queue job types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// What a job does to its video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessType {
    /// Produce transcript and length.
    All,
    /// Refresh only the length meta field.
    Length,
    /// Re-run speech-to-text from a given time, replacing the tail.
    Partial,
}

impl ProcessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Length => "length",
            Self::Partial => "partial",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "all" => Some(Self::All),
            "length" => Some(Self::Length),
            "partial" => Some(Self::Partial),
            _ => None,
        }
    }
}

/// One unit of work for the processor.
///
/// Two jobs are the same job when all three fields match; the queue
/// silently drops duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub process_type: ProcessType,
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

impl Job {
    pub fn all(path: impl Into<PathBuf>) -> Self {
        Self {
            process_type: ProcessType::All,
            path: path.into(),
            time: None,
        }
    }

    pub fn length(path: impl Into<PathBuf>) -> Self {
        Self {
            process_type: ProcessType::Length,
            path: path.into(),
            time: None,
        }
    }

    pub fn partial(path: impl Into<PathBuf>, time: impl Into<String>) -> Self {
        Self {
            process_type: ProcessType::Partial,
            path: path.into(),
            time: Some(time.into()),
        }
    }
}
