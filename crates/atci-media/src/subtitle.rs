//! Embedded subtitle stream extraction.

use std::path::Path;

use tracing::info;

use crate::command::{FfmpegCommand, ToolRunner};
use crate::error::MediaResult;

/// Extract one subtitle stream as SRT to `srt_out`.
pub async fn extract_subtitle_stream(
    ffmpeg: &Path,
    video: &Path,
    stream_index: usize,
    srt_out: &Path,
    runner: &ToolRunner,
) -> MediaResult<()> {
    info!(
        "extracting subtitle stream {} from {}",
        stream_index,
        video.display()
    );

    let cmd = FfmpegCommand::new(ffmpeg, video, srt_out)
        .map(format!("0:{stream_index}"))
        .output_args(["-c:s", "srt"]);

    runner.run_ffmpeg(&cmd).await
}
