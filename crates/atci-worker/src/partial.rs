//! Partial tail reprocessing.
//!
//! Re-runs speech-to-text from a user-supplied time: the transcript is
//! truncated before the first block containing that literal time, the
//! video tail is stream-copy cut to a temp file, transcribed, shifted
//! back by the cut offset and appended.

use std::path::Path;

use tracing::info;

use atci_media::command::resolve_tool;
use atci_media::stt::{model_id, vtt_output_path};
use atci_media::{SttRequest, ToolRunner};
use atci_models::transcript::{shift_timestamps, strip_vtt_header};
use atci_models::{parse_timestamp, sidecar, AtciConfig};
use atci_store::meta;

use crate::error::WorkerResult;
use crate::pipeline::{record_meta_field, write_transcript_atomic};

/// Re-run speech-to-text from `time` onward.
pub async fn reprocess_from(
    cfg: &AtciConfig,
    video: &Path,
    time: &str,
    runner: &ToolRunner,
) -> WorkerResult<()> {
    let offset = parse_timestamp(time)?;
    info!(
        "partial reprocess of {} from {} ({offset:.3}s)",
        video.display(),
        time
    );

    let txt_path = sidecar(video, "txt");
    let existing = if txt_path.is_file() {
        std::fs::read_to_string(&txt_path)?
    } else {
        String::new()
    };
    let truncated = atci_models::transcript::truncate_before_time(&existing, time);

    let ffmpeg = resolve_tool("ffmpeg", &cfg.ffmpeg_path)?;
    let whisper = resolve_tool("whisper-cli", &cfg.whispercli_path)?;
    let model = cfg.resolve_model_path()?;

    let dir = video.parent().unwrap_or_else(|| Path::new("."));
    let ext = video
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_else(|| "mp4".to_string());
    let cut = tempfile::Builder::new()
        .prefix(".partial-")
        .suffix(&format!(".{ext}"))
        .tempfile_in(dir)?
        .into_temp_path();

    atci_media::clip::extract_tail_segment(&ffmpeg, video, offset, &cut, runner).await?;

    let audio = cut.with_extension("mp3");
    let result = async {
        atci_media::audio::extract_audio(&ffmpeg, &cut, &audio, runner).await?;
        let request = SttRequest {
            model: &model,
            audio: &audio,
            prompt: None,
        };
        let vtt = atci_media::transcribe_audio(&whisper, &request, runner).await?;
        let raw = std::fs::read_to_string(&vtt)?;
        let _ = std::fs::remove_file(&vtt);
        Ok::<String, crate::error::WorkerError>(raw)
    }
    .await;

    // Temp cut video and audio go away regardless of outcome.
    let _ = std::fs::remove_file(&audio);
    let _ = std::fs::remove_file(vtt_output_path(&audio));
    let raw = match result {
        Ok(raw) => raw,
        Err(e) => {
            let _ = cut.close();
            return Err(e);
        }
    };
    let _ = cut.close();

    let shifted = shift_timestamps(&strip_vtt_header(&raw), offset);

    let mut out = truncated.trim_end().to_string();
    if !out.is_empty() {
        out.push_str("\n\n");
    }
    out.push_str(shifted.trim_start_matches('\n'));
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    write_transcript_atomic(&txt_path, &out)?;

    if let Ok(Some(_)) = meta::get_field(&sidecar(video, "meta"), "source") {
        record_meta_field(video, "source", &model_id(&model));
    }

    info!("partial reprocess complete for {}", video.display());
    Ok(())
}
