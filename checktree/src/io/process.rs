//! Command units: run a child process and report its exit status.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use anyhow::{Context, Result, anyhow};
use serde_json::json;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, error, instrument, warn};

use crate::work::{Completion, Unit};

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
}

impl CommandOutput {
    pub fn stdout_text(&self) -> String {
        with_notice(&self.stdout, self.stdout_truncated, "stdout")
    }

    pub fn stderr_text(&self) -> String {
        with_notice(&self.stderr, self.stderr_truncated, "stderr")
    }
}

fn with_notice(bytes: &[u8], truncated: usize, label: &str) -> String {
    let mut text = String::from_utf8_lossy(bytes).trim().to_string();
    if truncated > 0 {
        text.push_str(&format!("\n[{label} truncated {truncated} bytes]"));
    }
    text
}

/// Build a unit that runs `argv` in `cwd`.
///
/// Exit status 0 succeeds with the trimmed stdout. A non-zero exit fails with
/// `{"exit_code", "stderr"}`; a spawn error fails with its message.
pub fn command_unit(argv: Vec<String>, cwd: PathBuf, output_limit_bytes: usize) -> Unit {
    Unit::new(move |completion: Completion| {
        let argv = argv.clone();
        let cwd = cwd.clone();
        async move {
            match run_command(&argv, &cwd, output_limit_bytes).await {
                Ok(output) if output.status.success() => completion.succeed(output.stdout_text()),
                Ok(output) => completion.fail(json!({
                    "exit_code": output.status.code(),
                    "stderr": output.stderr_text(),
                })),
                Err(err) => completion.fail(format!("{err:#}")),
            }
        }
    })
}

/// Run a command to completion, capturing stdout/stderr up to `output_limit_bytes` each.
///
/// Both pipes are drained concurrently with the wait so a chatty child cannot
/// block on a full pipe.
#[instrument(skip_all, fields(program = argv.first().map(String::as_str), output_limit_bytes = output_limit_bytes))]
pub async fn run_command(
    argv: &[String],
    cwd: &Path,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| anyhow!("command must not be empty"))?;

    debug!("spawning child process");
    let mut child = match Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).with_context(|| format!("spawn {program}"));
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let ((stdout, stdout_truncated), (stderr, stderr_truncated), status) = tokio::try_join!(
        read_stream_limited(stdout, output_limit_bytes),
        read_stream_limited(stderr, output_limit_bytes),
        async { child.wait().await.context("wait for command") },
    )?;

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), "command finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
    })
}

async fn read_stream_limited<R: AsyncRead + Unpin>(
    mut reader: R,
    limit: usize,
) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).await.context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((buf, truncated))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn captures_stdout_and_status() {
        let temp = tempfile::tempdir().expect("tempdir");
        let output = run_command(&sh("echo hello; echo oops >&2"), temp.path(), 1024)
            .await
            .expect("run");
        assert!(output.status.success());
        assert_eq!(output.stdout_text(), "hello");
        assert_eq!(output.stderr_text(), "oops");
    }

    #[tokio::test]
    async fn truncates_output_beyond_limit() {
        let temp = tempfile::tempdir().expect("tempdir");
        let output = run_command(&sh("printf 0123456789"), temp.path(), 4)
            .await
            .expect("run");
        assert_eq!(output.stdout, b"0123");
        assert_eq!(output.stdout_truncated, 6);
        assert!(output.stdout_text().contains("[stdout truncated 6 bytes]"));
    }

    #[tokio::test]
    async fn runs_in_requested_directory() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("marker.txt"), "here").expect("write");
        let output = run_command(&sh("cat marker.txt"), temp.path(), 1024)
            .await
            .expect("run");
        assert_eq!(output.stdout_text(), "here");
    }

    #[tokio::test]
    async fn empty_command_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = run_command(&[], temp.path(), 1024)
            .await
            .expect_err("expected error");
        assert!(err.to_string().contains("must not be empty"));
    }
}
