//! Success/failure hook commands.
//!
//! Hooks are fire-and-best-effort: the processor pipes the video path to
//! the configured shell command's stdin and waits only a bounded time.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::warn;

const HOOK_WAIT: Duration = Duration::from_secs(30);

/// Spawn a hook command with the video path on stdin.
///
/// Failures are logged, never fatal to the job.
pub async fn run_hook(command: &str, video: &Path) {
    if command.trim().is_empty() {
        return;
    }

    let spawned = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(e) => {
            warn!("failed to spawn hook '{command}': {e}");
            return;
        }
    };

    if let Some(mut stdin) = child.stdin.take() {
        let line = format!("{}\n", video.display());
        if let Err(e) = stdin.write_all(line.as_bytes()).await {
            warn!("failed to write video path to hook stdin: {e}");
        }
        drop(stdin);
    }

    match tokio::time::timeout(HOOK_WAIT, child.wait()).await {
        Ok(Ok(status)) if !status.success() => {
            warn!("hook '{command}' exited with {status}");
        }
        Ok(Ok(_)) => {}
        Ok(Err(e)) => warn!("hook '{command}' failed: {e}"),
        Err(_) => {
            // Past the bounded wait the hook keeps running detached.
            warn!("hook '{command}' still running after {}s, detaching", HOOK_WAIT.as_secs());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_hook_is_noop() {
        run_hook("", Path::new("/v/a.mp4")).await;
        run_hook("   ", Path::new("/v/a.mp4")).await;
    }

    #[tokio::test]
    async fn test_hook_receives_path_on_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("hook-out");
        let cmd = format!("cat > {}", out.display());
        run_hook(&cmd, Path::new("/v/a.mp4")).await;
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "/v/a.mp4\n");
    }

    #[tokio::test]
    async fn test_failing_hook_does_not_panic() {
        run_hook("exit 3", Path::new("/v/a.mp4")).await;
    }
}
