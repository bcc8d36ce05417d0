//! Whisper CLI driver.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::command::ToolRunner;
use crate::error::{MediaError, MediaResult};

/// One transcription request.
#[derive(Debug, Clone)]
pub struct SttRequest<'a> {
    /// Model file (ggml weights)
    pub model: &'a Path,
    /// Mono 16 kHz audio input
    pub audio: &'a Path,
    /// Optional biasing prompt
    pub prompt: Option<&'a str>,
}

/// Model identifier recorded as transcript provenance: the model file stem.
pub fn model_id(model: &Path) -> String {
    model
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| model.to_string_lossy().to_string())
}

/// Path the whisper CLI writes its VTT output to: `<audio>.vtt`.
pub fn vtt_output_path(audio: &Path) -> PathBuf {
    let mut os: OsString = audio.as_os_str().to_os_string();
    os.push(".vtt");
    PathBuf::from(os)
}

/// Run the whisper CLI over an extracted audio track.
///
/// Returns the path of the VTT file the CLI produced.
pub async fn transcribe_audio(
    whisper: &Path,
    request: &SttRequest<'_>,
    runner: &ToolRunner,
) -> MediaResult<PathBuf> {
    if !request.model.is_file() {
        return Err(MediaError::ToolNotFound {
            tool: "whisper model",
            configured: request.model.to_string_lossy().to_string(),
        });
    }

    info!(
        "transcribing {} with model {}",
        request.audio.display(),
        model_id(request.model)
    );

    let mut args: Vec<String> = vec![
        "-m".into(),
        request.model.to_string_lossy().to_string(),
        "-np".into(),
        "--max-context".into(),
        "0".into(),
        "-ovtt".into(),
    ];
    if let Some(prompt) = request.prompt {
        args.push("--prompt".into());
        args.push(prompt.to_string());
    }
    args.push("-f".into());
    args.push(request.audio.to_string_lossy().to_string());

    runner.run(whisper, &args, "whisper").await?;

    let vtt = vtt_output_path(request.audio);
    if !vtt.is_file() {
        return Err(MediaError::invalid_output(
            "whisper",
            format!("expected output {} was not produced", vtt.display()),
        ));
    }
    Ok(vtt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_id_is_file_stem() {
        assert_eq!(model_id(Path::new("/m/ggml-base.bin")), "ggml-base");
        assert_eq!(model_id(Path::new("ggml-large-v3.bin")), "ggml-large-v3");
    }

    #[test]
    fn test_vtt_output_path_appends_extension() {
        assert_eq!(
            vtt_output_path(Path::new("/v/a.mp3")),
            PathBuf::from("/v/a.mp3.vtt")
        );
    }
}
