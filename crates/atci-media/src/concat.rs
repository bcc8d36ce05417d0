//! Stream-copy video concatenation.
//!
//! Uses the ffmpeg concat demuxer so no re-encode happens; inputs must
//! share codecs, which holds for parts of one recording.

use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::command::ToolRunner;
use crate::error::{MediaError, MediaResult};

/// Escape a path for a concat demuxer list file entry.
fn concat_list_entry(path: &Path) -> String {
    let escaped = path.to_string_lossy().replace('\'', r"'\''");
    format!("file '{escaped}'")
}

/// Concatenate `inputs` into `output` without re-encoding.
///
/// The result is assembled in a temporary sibling and renamed into
/// place, so `output` may appear among the inputs (master + next part).
pub async fn concat_videos(
    ffmpeg: &Path,
    inputs: &[&Path],
    output: &Path,
    runner: &ToolRunner,
) -> MediaResult<()> {
    if inputs.is_empty() {
        return Err(MediaError::invalid_output("ffmpeg", "no concat inputs"));
    }

    info!("concatenating {} inputs into {}", inputs.len(), output.display());

    let dir = output.parent().unwrap_or_else(|| Path::new("."));
    let mut list = tempfile::Builder::new()
        .prefix(".concat-")
        .suffix(".txt")
        .tempfile_in(dir)?;
    for input in inputs {
        writeln!(list, "{}", concat_list_entry(input))?;
    }
    list.flush()?;

    let staged = tempfile::Builder::new()
        .prefix(".concat-out-")
        .suffix(&format!(
            ".{}",
            output.extension().unwrap_or_default().to_string_lossy()
        ))
        .tempfile_in(dir)?;
    let staged_path = staged.into_temp_path();

    let args: Vec<String> = vec![
        "-y".into(),
        "-v".into(),
        "error".into(),
        "-f".into(),
        "concat".into(),
        "-safe".into(),
        "0".into(),
        "-i".into(),
        list.path().to_string_lossy().to_string(),
        "-c".into(),
        "copy".into(),
        staged_path.to_string_lossy().to_string(),
    ];

    runner.run(ffmpeg, &args, "ffmpeg").await?;

    staged_path.persist(output).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_list_entry_escapes_quotes() {
        assert_eq!(
            concat_list_entry(Path::new("/v/it's.mkv")),
            r"file '/v/it'\''s.mkv'"
        );
        assert_eq!(concat_list_entry(Path::new("/v/a.mkv")), "file '/v/a.mkv'");
    }
}
