//! Stream-copy segment extraction.

use std::path::Path;

use tracing::info;

use crate::command::{FfmpegCommand, ToolRunner};
use crate::error::MediaResult;

/// Extract everything from `start_secs` to the end of the video,
/// stream-copied, with timestamps rebased to zero.
pub async fn extract_tail_segment(
    ffmpeg: &Path,
    video: &Path,
    start_secs: f64,
    output: &Path,
    runner: &ToolRunner,
) -> MediaResult<()> {
    info!(
        "cutting {} from {:.3}s into {}",
        video.display(),
        start_secs,
        output.display()
    );

    let cmd = FfmpegCommand::new(ffmpeg, video, output)
        .seek(start_secs)
        .output_args(["-c", "copy", "-avoid_negative_ts", "make_zero"]);

    runner.run_ffmpeg(&cmd).await
}
