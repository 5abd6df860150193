use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

#[derive(Debug)]
pub struct CommandRunResult {
    pub status: Option<ExitStatus>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl CommandRunResult {
    pub fn success(&self) -> bool {
        !self.timed_out && self.status.is_some_and(|s| s.success())
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.status.and_then(|s| s.code())
    }
}

/// Run a command to completion, draining stdout and stderr concurrently.
///
/// The child never outlives this call: it is killed and reaped when the
/// timeout elapses, and it is created with `kill_on_drop` so a cancelled
/// caller also terminates it.
pub async fn run_command_with_timeout(
    command: &mut Command,
    timeout: Duration,
) -> Result<CommandRunResult, String> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| format!("Failed to start command: {}", e))?;

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| "Failed to capture stdout".to_string())?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| "Failed to capture stderr".to_string())?;

    let mut stdout_buf = Vec::new();
    let mut stderr_buf = Vec::new();
    let collect = async {
        let (out, err, status) = tokio::join!(
            stdout.read_to_end(&mut stdout_buf),
            stderr.read_to_end(&mut stderr_buf),
            child.wait()
        );
        if let Err(e) = out.and(err) {
            tracing::debug!(error = %e, "failed to drain command output");
        }
        status
    };
    let outcome = tokio::time::timeout(timeout, collect).await;

    let (status, timed_out) = match outcome {
        Ok(Ok(status)) => (Some(status), false),
        Ok(Err(e)) => return Err(format!("Failed to wait for command: {}", e)),
        Err(_) => {
            if let Err(e) = child.kill().await {
                tracing::warn!(error = %e, "failed to kill timed out command");
            }
            (None, true)
        }
    };

    Ok(CommandRunResult {
        status,
        stdout: String::from_utf8_lossy(&stdout_buf).to_string(),
        stderr: String::from_utf8_lossy(&stderr_buf).to_string(),
        timed_out,
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut command = Command::new("sh");
        command.arg("-c").arg(script);
        command
    }

    #[tokio::test]
    async fn test_run_command_captures_both_streams() {
        let result = run_command_with_timeout(
            &mut sh("echo out; echo err 1>&2"),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert!(result.success());
        assert_eq!(result.stdout.trim(), "out");
        assert_eq!(result.stderr.trim(), "err");
    }

    #[tokio::test]
    async fn test_run_command_reports_exit_code() {
        let result = run_command_with_timeout(&mut sh("exit 3"), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(!result.success());
        assert_eq!(result.exit_code(), Some(3));
    }

    #[tokio::test]
    async fn test_run_command_times_out_and_kills() {
        let started = std::time::Instant::now();
        let result = run_command_with_timeout(&mut sh("sleep 30"), Duration::from_millis(200))
            .await
            .unwrap();

        assert!(result.timed_out);
        assert!(!result.success());
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_run_command_spawn_failure_is_error() {
        let mut command = Command::new("/definitely/not/a/real/binary");
        let result = run_command_with_timeout(&mut command, Duration::from_secs(1)).await;
        assert!(result.is_err());
    }
}
