//! Per-video transcript creation and length capture.
//!
//! Shared by the processor (plain videos) and the parts assembler
//! (individual parts). Transcripts are staged to a temp sibling and
//! renamed into place, so a crash or cancellation never leaves a
//! half-written `.txt`.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use atci_media::command::resolve_tool;
use atci_media::stt::{model_id, vtt_output_path};
use atci_media::{probe_media, MediaError, SttRequest, ToolRunner};
use atci_models::transcript::{convert_srt, strip_vtt_header};
use atci_models::{sidecar, timestamp, AtciConfig};
use atci_store::meta;

use crate::error::{WorkerError, WorkerResult};

/// Where a transcript came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptSource {
    /// Converted from an embedded subtitle stream.
    Subtitles,
    /// Produced by the speech-to-text CLI with this model.
    Model(String),
}

impl TranscriptSource {
    /// Value recorded in the `source` meta field.
    pub fn meta_value(&self) -> &str {
        match self {
            Self::Subtitles => "subtitles",
            Self::Model(id) => id,
        }
    }
}

/// Write transcript content atomically: temp sibling, then rename.
pub fn write_transcript_atomic(txt_path: &Path, content: &str) -> WorkerResult<()> {
    let tmp = staging_path(txt_path);
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, txt_path)?;
    Ok(())
}

fn staging_path(txt_path: &Path) -> PathBuf {
    let name = txt_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "transcript.txt".to_string());
    txt_path.with_file_name(format!(".{name}.tmp"))
}

/// Remove per-video temp artifacts left by an interrupted job.
pub fn cleanup_job_temps(video: &Path) {
    let audio = sidecar(video, "mp3");
    for path in [
        staging_path(&sidecar(video, "txt")),
        vtt_output_path(&audio),
        audio,
    ] {
        if path.exists() {
            let _ = std::fs::remove_file(&path);
        }
    }
}

/// Record a meta field, logging instead of failing the job.
///
/// The transcript is already on disk by the time meta updates happen,
/// so a failed sidecar write is not worth losing the work over.
pub fn record_meta_field(video: &Path, key: &str, value: &str) {
    let meta_path = sidecar(video, "meta");
    if let Err(e) = meta::update_field(&meta_path, key, value) {
        warn!("failed to update {} in {}: {e}", key, meta_path.display());
    }
}

/// Create a transcript beside `video`.
///
/// Embedded text subtitles win when allowed and present; otherwise the
/// speech-to-text path runs over a derived mono 16 kHz audio track.
pub async fn create_transcript(
    cfg: &AtciConfig,
    video: &Path,
    runner: &ToolRunner,
) -> WorkerResult<TranscriptSource> {
    let txt_path = sidecar(video, "txt");
    info!("creating transcript for {}", video.display());

    if cfg.allow_subtitles {
        match try_subtitles(cfg, video, &txt_path, runner).await {
            Ok(true) => return Ok(TranscriptSource::Subtitles),
            Ok(false) => {}
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => warn!("subtitle path failed, falling back to speech-to-text: {e}"),
        }
    }

    if !cfg.allow_whisper {
        return Err(WorkerError::TranscriptionDisabled);
    }
    transcribe_with_model(cfg, video, &txt_path, runner).await
}

/// Try the embedded-subtitle path. `Ok(false)` means no text stream.
async fn try_subtitles(
    cfg: &AtciConfig,
    video: &Path,
    txt_path: &Path,
    runner: &ToolRunner,
) -> WorkerResult<bool> {
    let ffprobe = resolve_tool("ffprobe", &cfg.ffprobe_path)?;
    let info = probe_media(&ffprobe, video).await?;
    let Some(stream) = info.first_text_subtitle() else {
        return Ok(false);
    };
    info!(
        "found {} subtitle stream at index {}",
        stream.language_display(),
        stream.index
    );

    let ffmpeg = resolve_tool("ffmpeg", &cfg.ffmpeg_path)?;
    let dir = video.parent().unwrap_or_else(|| Path::new("."));
    let srt_tmp = tempfile::Builder::new()
        .prefix(".subtitles-")
        .suffix(".srt")
        .tempfile_in(dir)?;

    atci_media::subtitle::extract_subtitle_stream(
        &ffmpeg,
        video,
        stream.index,
        srt_tmp.path(),
        runner,
    )
    .await?;

    let srt = std::fs::read_to_string(srt_tmp.path())?;
    // Zero parseable blocks still count as a subtitle transcript.
    let content = convert_srt(&srt);
    write_transcript_atomic(txt_path, &content)?;
    record_meta_field(video, "source", "subtitles");
    Ok(true)
}

/// Speech-to-text path: extract audio, run the CLI, normalize its VTT.
async fn transcribe_with_model(
    cfg: &AtciConfig,
    video: &Path,
    txt_path: &Path,
    runner: &ToolRunner,
) -> WorkerResult<TranscriptSource> {
    let ffprobe = resolve_tool("ffprobe", &cfg.ffprobe_path)?;
    let info = probe_media(&ffprobe, video).await?;
    if !info.has_audio {
        return Err(MediaError::NoAudio(video.to_path_buf()).into());
    }

    let ffmpeg = resolve_tool("ffmpeg", &cfg.ffmpeg_path)?;
    let whisper = resolve_tool("whisper-cli", &cfg.whispercli_path)?;
    let model = cfg.resolve_model_path()?;

    let audio = sidecar(video, "mp3");
    let result = run_stt(video, txt_path, &ffmpeg, &whisper, &model, &audio, runner).await;
    if result.is_err() {
        cleanup_job_temps(video);
    }
    result
}

#[allow(clippy::too_many_arguments)]
async fn run_stt(
    video: &Path,
    txt_path: &Path,
    ffmpeg: &Path,
    whisper: &Path,
    model: &Path,
    audio: &Path,
    runner: &ToolRunner,
) -> WorkerResult<TranscriptSource> {
    atci_media::audio::extract_audio(ffmpeg, video, audio, runner).await?;

    let prompt = meta::get_field(&sidecar(video, "meta"), "prompt")?;
    let request = SttRequest {
        model,
        audio,
        prompt: prompt.as_deref(),
    };
    let vtt = atci_media::transcribe_audio(whisper, &request, runner).await?;

    let raw = std::fs::read_to_string(&vtt)?;
    write_transcript_atomic(txt_path, &strip_vtt_header(&raw))?;

    let _ = std::fs::remove_file(&vtt);
    let _ = std::fs::remove_file(audio);

    let id = model_id(model);
    record_meta_field(video, "source", &id);
    info!("transcript written to {}", txt_path.display());
    Ok(TranscriptSource::Model(id))
}

/// Probe the video's duration and record it as `length: HH:MM:SS`.
pub async fn capture_length(cfg: &AtciConfig, video: &Path) -> WorkerResult<String> {
    let ffprobe = resolve_tool("ffprobe", &cfg.ffprobe_path)?;
    let duration = atci_media::probe::probe_duration(&ffprobe, video).await?;
    let formatted = timestamp::format_seconds_hms(duration);
    record_meta_field(video, "length", &formatted);
    Ok(formatted)
}
