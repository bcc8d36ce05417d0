//! Audio track extraction for speech-to-text.

use std::path::Path;

use tracing::info;

use crate::command::{FfmpegCommand, ToolRunner};
use crate::error::MediaResult;

/// Extract the first audio stream to a mono 16 kHz file.
///
/// The whisper CLI expects this exact shape; anything else degrades
/// recognition quality or is rejected outright.
pub async fn extract_audio(
    ffmpeg: &Path,
    video: &Path,
    audio_out: &Path,
    runner: &ToolRunner,
) -> MediaResult<()> {
    info!("extracting audio: {} -> {}", video.display(), audio_out.display());

    let cmd = FfmpegCommand::new(ffmpeg, video, audio_out)
        .map("0:a:0")
        .output_args(["-q:a", "0", "-ac", "1", "-ar", "16000"]);

    runner.run_ffmpeg(&cmd).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_args() {
        let cmd = FfmpegCommand::new("ffmpeg", "in.mkv", "out.mp3")
            .map("0:a:0")
            .output_args(["-q:a", "0", "-ac", "1", "-ar", "16000"]);
        let args = cmd.build_args();
        assert!(args.windows(2).any(|w| w == ["-ac", "1"]));
        assert!(args.windows(2).any(|w| w == ["-ar", "16000"]));
        assert!(args.windows(2).any(|w| w == ["-map", "0:a:0"]));
    }
}
