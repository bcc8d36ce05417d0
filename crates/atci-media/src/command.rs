//! FFmpeg command builder and cancellation-aware runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Resolve a configured tool path.
///
/// Bare names are looked up on `PATH`; explicit paths must exist.
pub fn resolve_tool(tool: &'static str, configured: &str) -> MediaResult<PathBuf> {
    if configured.is_empty() {
        return Err(MediaError::ToolNotFound {
            tool,
            configured: configured.to_string(),
        });
    }
    let path = Path::new(configured);
    if path.components().count() > 1 {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(MediaError::ToolNotFound {
            tool,
            configured: configured.to_string(),
        });
    }
    which::which(configured).map_err(|_| MediaError::ToolNotFound {
        tool,
        configured: configured.to_string(),
    })
}

/// Builder for ffmpeg invocations.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// ffmpeg binary
    binary: PathBuf,
    /// Input file path
    input: PathBuf,
    /// Output file path
    output: PathBuf,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Log level
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new ffmpeg command.
    pub fn new(binary: impl AsRef<Path>, input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            binary: binary.as_ref().to_path_buf(),
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            log_level: "error".to_string(),
        }
    }

    /// Add an input argument (before -i).
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add an output argument (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Seek before the input.
    pub fn seek(self, seconds: f64) -> Self {
        self.input_arg("-ss").input_arg(format!("{:.3}", seconds))
    }

    /// Map a stream by specifier.
    pub fn map(self, specifier: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(specifier)
    }

    /// Build the argument vector.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        args.push("-y".to_string());
        args.push("-v".to_string());
        args.push(self.log_level.clone());

        args.extend(self.input_args.clone());
        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());
        args.extend(self.output_args.clone());
        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Runner for external tool commands with cooperative cancellation.
///
/// When the cancel channel flips to `true` the child is killed and the
/// run returns `MediaError::Cancelled`.
#[derive(Clone, Default)]
pub struct ToolRunner {
    cancel_rx: Option<watch::Receiver<bool>>,
}

impl ToolRunner {
    /// Create a runner without cancellation.
    pub fn new() -> Self {
        Self { cancel_rx: None }
    }

    /// Attach a cancellation signal.
    pub fn with_cancel(cancel_rx: watch::Receiver<bool>) -> Self {
        Self {
            cancel_rx: Some(cancel_rx),
        }
    }

    /// Run an ffmpeg command to completion.
    pub async fn run_ffmpeg(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        let args = cmd.build_args();
        debug!("running ffmpeg {}", args.join(" "));
        self.run(&cmd.binary, &args, "ffmpeg").await
    }

    /// Run an arbitrary tool to completion, failing on non-zero exit.
    pub async fn run(&self, binary: &Path, args: &[String], tool: &str) -> MediaResult<()> {
        let mut child = Command::new(binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                MediaError::tool_failed(tool, format!("failed to spawn: {e}"), None, None)
            })?;

        // Drain stderr concurrently so the child never blocks on a full pipe.
        let stderr = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut collected = String::new();
            if let Some(stderr) = stderr {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    collected.push_str(&line);
                    collected.push('\n');
                }
            }
            collected
        });

        let status = self.wait_for_completion(&mut child).await;
        let stderr_text = stderr_task.await.unwrap_or_default();

        let status = status?;
        if status.success() {
            Ok(())
        } else {
            Err(MediaError::tool_failed(
                tool,
                "exited with non-zero status",
                if stderr_text.is_empty() {
                    None
                } else {
                    Some(stderr_text)
                },
                status.code(),
            ))
        }
    }

    /// Wait for the child, racing against the cancellation signal.
    async fn wait_for_completion(&self, child: &mut Child) -> MediaResult<std::process::ExitStatus> {
        let Some(rx) = self.cancel_rx.clone() else {
            return Ok(child.wait().await?);
        };
        let mut rx = rx;
        if *rx.borrow() {
            let _ = child.kill().await;
            return Err(MediaError::Cancelled);
        }
        loop {
            tokio::select! {
                status = child.wait() => {
                    return Ok(status?);
                }
                changed = rx.changed() => {
                    match changed {
                        Ok(()) if *rx.borrow() => {
                            let _ = child.kill().await;
                            let _ = child.wait().await;
                            return Err(MediaError::Cancelled);
                        }
                        Ok(()) => {}
                        // Sender gone: no cancellation can arrive anymore.
                        Err(_) => return Ok(child.wait().await?),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder_arg_order() {
        let cmd = FfmpegCommand::new("/usr/bin/ffmpeg", "in.mkv", "out.srt")
            .seek(10.0)
            .map("0:2")
            .output_arg("-c:s")
            .output_arg("srt");

        let args = cmd.build_args();
        let i_pos = args.iter().position(|a| a == "-i").unwrap();
        let ss_pos = args.iter().position(|a| a == "-ss").unwrap();
        let map_pos = args.iter().position(|a| a == "-map").unwrap();
        assert!(ss_pos < i_pos, "seek is an input argument");
        assert!(map_pos > i_pos, "map is an output argument");
        assert_eq!(args.last().unwrap(), "out.srt");
        assert!(args.contains(&"10.000".to_string()));
    }

    #[test]
    fn test_resolve_tool_rejects_empty() {
        assert!(matches!(
            resolve_tool("ffmpeg", ""),
            Err(MediaError::ToolNotFound { .. })
        ));
    }

    #[test]
    fn test_resolve_tool_rejects_missing_path() {
        assert!(matches!(
            resolve_tool("ffmpeg", "/definitely/not/here/ffmpeg"),
            Err(MediaError::ToolNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_runner_cancel_before_start() {
        let (tx, rx) = tokio::sync::watch::channel(true);
        let runner = ToolRunner::with_cancel(rx);
        // `true` already latched: the run must cancel instead of spawning work.
        let err = runner
            .run(Path::new("/bin/sleep"), &["5".to_string()], "sleep")
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        drop(tx);
    }
}
