//! FFprobe media information.

use std::path::Path;
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;

use crate::error::{MediaError, MediaResult};

/// Probed media information used by the pipeline.
#[derive(Debug, Clone)]
pub struct MediaInfo {
    /// Duration in seconds
    pub duration: f64,
    /// Whether at least one audio stream exists
    pub has_audio: bool,
    /// Subtitle streams in container order
    pub subtitle_streams: Vec<SubtitleStream>,
}

impl MediaInfo {
    /// First subtitle stream carried in a text codec, if any.
    pub fn first_text_subtitle(&self) -> Option<&SubtitleStream> {
        self.subtitle_streams.iter().find(|s| s.is_text())
    }
}

/// One subtitle stream.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SubtitleStream {
    /// Stream index within the container
    pub index: usize,
    /// Codec name as reported by ffprobe
    pub codec: String,
    /// ISO-639 language tag, when present
    pub language: Option<String>,
}

impl SubtitleStream {
    /// Whether the codec is a text subtitle format we can convert.
    pub fn is_text(&self) -> bool {
        matches!(
            self.codec.as_str(),
            "subrip" | "srt" | "ass" | "ssa" | "webvtt" | "mov_text" | "text"
        )
    }

    /// Human-readable language name for the API.
    pub fn language_display(&self) -> String {
        match self.language.as_deref() {
            Some(code) => expand_language_code(code),
            None => "Unknown".to_string(),
        }
    }
}

fn expand_language_code(code: &str) -> String {
    match code.to_lowercase().as_str() {
        "eng" | "en" => "English".to_string(),
        "fre" | "fra" | "fr" => "French".to_string(),
        "ger" | "deu" | "de" => "German".to_string(),
        "spa" | "es" => "Spanish".to_string(),
        "ita" | "it" => "Italian".to_string(),
        "por" | "pt" => "Portuguese".to_string(),
        "rus" | "ru" => "Russian".to_string(),
        "jpn" | "ja" => "Japanese".to_string(),
        "chi" | "zho" | "zh" => "Chinese".to_string(),
        "kor" | "ko" => "Korean".to_string(),
        "ara" | "ar" => "Arabic".to_string(),
        "hin" | "hi" => "Hindi".to_string(),
        "dut" | "nld" | "nl" => "Dutch".to_string(),
        "swe" | "sv" => "Swedish".to_string(),
        "nor" | "no" => "Norwegian".to_string(),
        "dan" | "da" => "Danish".to_string(),
        "fin" | "fi" => "Finnish".to_string(),
        "pol" | "pl" => "Polish".to_string(),
        "tur" | "tr" => "Turkish".to_string(),
        _ => code.to_uppercase(),
    }
}

/// FFprobe JSON output shape.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    index: usize,
    codec_type: String,
    codec_name: Option<String>,
    tags: Option<FfprobeTags>,
}

#[derive(Debug, Deserialize)]
struct FfprobeTags {
    language: Option<String>,
}

/// Probe a media file for duration, audio presence and subtitle streams.
pub async fn probe_media(ffprobe: &Path, media: &Path) -> MediaResult<MediaInfo> {
    if !media.exists() {
        return Err(MediaError::FileNotFound(media.to_path_buf()));
    }

    let output = Command::new(ffprobe)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(media)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::tool_failed(
            "ffprobe",
            "exited with non-zero status",
            Some(String::from_utf8_lossy(&output.stderr).to_string()),
            output.status.code(),
        ));
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;
    Ok(summarize(probe))
}

fn summarize(probe: FfprobeOutput) -> MediaInfo {
    let duration = probe
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let has_audio = probe.streams.iter().any(|s| s.codec_type == "audio");

    let subtitle_streams = probe
        .streams
        .into_iter()
        .filter(|s| s.codec_type == "subtitle")
        .map(|s| SubtitleStream {
            index: s.index,
            codec: s.codec_name.unwrap_or_default(),
            language: s.tags.and_then(|t| t.language).filter(|l| l != "N/A" && !l.is_empty()),
        })
        .collect();

    MediaInfo {
        duration,
        has_audio,
        subtitle_streams,
    }
}

/// Probe just the duration in seconds.
pub async fn probe_duration(ffprobe: &Path, media: &Path) -> MediaResult<f64> {
    let info = probe_media(ffprobe, media).await?;
    Ok(info.duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROBE_JSON: &str = r#"{
        "format": {"duration": "600.040000"},
        "streams": [
            {"index": 0, "codec_type": "video", "codec_name": "h264"},
            {"index": 1, "codec_type": "audio", "codec_name": "aac"},
            {"index": 2, "codec_type": "subtitle", "codec_name": "subrip", "tags": {"language": "eng"}},
            {"index": 3, "codec_type": "subtitle", "codec_name": "hdmv_pgs_subtitle"}
        ]
    }"#;

    #[test]
    fn test_summarize_probe_output() {
        let probe: FfprobeOutput = serde_json::from_str(PROBE_JSON).unwrap();
        let info = summarize(probe);
        assert!((info.duration - 600.04).abs() < 0.001);
        assert!(info.has_audio);
        assert_eq!(info.subtitle_streams.len(), 2);

        let text = info.first_text_subtitle().unwrap();
        assert_eq!(text.index, 2);
        assert_eq!(text.language_display(), "English");
    }

    #[test]
    fn test_bitmap_subtitles_are_not_text() {
        let s = SubtitleStream {
            index: 0,
            codec: "hdmv_pgs_subtitle".into(),
            language: None,
        };
        assert!(!s.is_text());
        assert_eq!(s.language_display(), "Unknown");
    }

    #[test]
    fn test_language_code_expansion() {
        let s = SubtitleStream {
            index: 0,
            codec: "subrip".into(),
            language: Some("fra".into()),
        };
        assert_eq!(s.language_display(), "French");

        let unknown = SubtitleStream {
            index: 0,
            codec: "subrip".into(),
            language: Some("xyz".into()),
        };
        assert_eq!(unknown.language_display(), "XYZ");
    }

    #[test]
    fn test_missing_format_defaults_to_zero_duration() {
        let probe: FfprobeOutput = serde_json::from_str(r#"{"streams": []}"#).unwrap();
        let info = summarize(probe);
        assert_eq!(info.duration, 0.0);
        assert!(!info.has_audio);
    }
}
