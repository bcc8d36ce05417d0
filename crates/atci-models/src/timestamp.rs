//! Timestamp parsing and formatting.
//!
//! Transcript timestamps are `HH:MM:SS.mmm`; meta lengths are `HH:MM:SS`.
//! User-supplied times (partial reprocessing) may be `HH:MM:SS[.mmm]`,
//! `MM:SS[.mmm]`, or bare seconds.

use thiserror::Error;

/// Timestamp parsing error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimestampError {
    #[error("timestamp cannot be empty")]
    Empty,

    #[error("timestamp cannot be negative")]
    Negative,

    #[error("invalid {0} value: {1}")]
    InvalidValue(&'static str, String),

    #[error("invalid timestamp format '{0}'; use HH:MM:SS, MM:SS, or seconds")]
    InvalidFormat(String),
}

/// Parse a timestamp string to total seconds.
pub fn parse_timestamp(ts: &str) -> Result<f64, TimestampError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(TimestampError::Empty);
    }

    let parts: Vec<&str> = ts.split(':').collect();
    let component = |name: &'static str, raw: &str| -> Result<f64, TimestampError> {
        let v: f64 = raw
            .parse()
            .map_err(|_| TimestampError::InvalidValue(name, raw.to_string()))?;
        if v < 0.0 {
            return Err(TimestampError::Negative);
        }
        Ok(v)
    };

    match parts.len() {
        1 => component("seconds", parts[0]),
        2 => {
            let minutes = component("minutes", parts[0])?;
            let seconds = component("seconds", parts[1])?;
            Ok(minutes * 60.0 + seconds)
        }
        3 => {
            let hours = component("hours", parts[0])?;
            let minutes = component("minutes", parts[1])?;
            let seconds = component("seconds", parts[2])?;
            Ok(hours * 3600.0 + minutes * 60.0 + seconds)
        }
        _ => Err(TimestampError::InvalidFormat(ts.to_string())),
    }
}

/// Format seconds as `HH:MM:SS.mmm`.
pub fn format_seconds_millis(total_secs: f64) -> String {
    let total_ms = (total_secs * 1000.0).round().max(0.0) as u64;
    let ms = total_ms % 1000;
    let secs = total_ms / 1000;
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60,
        ms
    )
}

/// Format seconds as `HH:MM:SS`, truncating the sub-second part.
pub fn format_seconds_hms(total_secs: f64) -> String {
    let secs = total_secs.max(0.0) as u64;
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
