//! Process Invoker
//!
//! Runs one external command synchronously from the caller's point of view:
//! spawns the child with piped stdio, drains stdout and stderr with two
//! concurrent reader tasks so neither pipe can back-pressure the other, and
//! bounds the wait with a hard timeout that kills the child on expiry.
//!
//! Ordinary process failure (non-zero exit) is not an error here; only spawn
//! failure surfaces as `Err`. Everything else is recorded on the returned
//! `ProcessInvocation`.

use std::path::Path;
use std::process::Stdio;
use std::time::Instant;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use codegauge_core::{CoreError, CoreResult};

/// Captured outcome of a single external process invocation.
///
/// Created fresh per pass and discarded after interpretation; only the
/// derived analysis text survives.
#[derive(Debug, Clone)]
pub struct ProcessInvocation {
    /// Command that was run
    pub command: String,
    /// Arguments passed to the command
    pub args: Vec<String>,
    /// Captured standard output (size-capped)
    pub stdout: String,
    /// Captured standard error (size-capped)
    pub stderr: String,
    /// Exit code, if the process exited normally
    pub exit_code: Option<i32>,
    /// Whether the process was killed on timeout
    pub timed_out: bool,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

impl ProcessInvocation {
    /// The text to hand to the extractor. Standard output is preferred; if it
    /// is blank but standard error is not, standard error is used (some CLIs
    /// report useful content only there). `None` means both were blank.
    pub fn analysis_text(&self) -> Option<&str> {
        if !self.stdout.trim().is_empty() {
            Some(&self.stdout)
        } else if !self.stderr.trim().is_empty() {
            Some(&self.stderr)
        } else {
            None
        }
    }

    /// Whether the process completed but produced nothing usable
    pub fn is_empty_output(&self) -> bool {
        self.analysis_text().is_none()
    }
}

/// Invoker configuration
#[derive(Debug, Clone)]
pub struct InvokerConfig {
    /// Maximum bytes to retain per stream
    pub max_output_bytes: usize,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            max_output_bytes: 1024 * 1024, // 1MB
        }
    }
}

/// Runs external commands with bounded waits and full stream capture
#[derive(Debug, Clone, Default)]
pub struct ProcessInvoker {
    config: InvokerConfig,
}

impl ProcessInvoker {
    /// Create an invoker with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set configuration
    pub fn with_config(mut self, config: InvokerConfig) -> Self {
        self.config = config;
        self
    }

    /// Run a command to completion or timeout.
    ///
    /// Returns `Err` only when the process cannot be spawned. A non-zero exit
    /// code or a timeout is reported on the returned invocation instead.
    pub async fn invoke(
        &self,
        command: &str,
        args: &[String],
        working_dir: &Path,
        wait: Duration,
    ) -> CoreResult<ProcessInvocation> {
        let start = Instant::now();

        let mut cmd = Command::new(command);
        cmd.args(args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CoreError::command(format!("Command '{}' not found in PATH", command))
            } else {
                CoreError::command(format!("Failed to spawn '{}': {}", command, e))
            }
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CoreError::command("Failed to capture child stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| CoreError::command("Failed to capture child stderr"))?;

        let cap = self.config.max_output_bytes;
        let stdout_reader = spawn_stream_reader(stdout, cap);
        let stderr_reader = spawn_stream_reader(stderr, cap);

        let mut invocation = ProcessInvocation {
            command: command.to_string(),
            args: args.to_vec(),
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            timed_out: false,
            duration_ms: 0,
        };

        match timeout(wait, child.wait()).await {
            Ok(Ok(status)) => {
                invocation.exit_code = status.code();
                // Both readers must join before the buffers are trusted
                invocation.stdout = join_reader(stdout_reader).await;
                invocation.stderr = join_reader(stderr_reader).await;
            }
            Ok(Err(e)) => {
                stdout_reader.abort();
                stderr_reader.abort();
                return Err(CoreError::command(format!(
                    "Failed to wait for '{}': {}",
                    command, e
                )));
            }
            Err(_) => {
                // Hard timeout: kill, don't ask. Readers may not have
                // finished and are not required to.
                warn!(command, timeout_secs = wait.as_secs(), "process timed out, killing");
                if let Err(e) = child.kill().await {
                    warn!(command, error = %e, "failed to kill timed-out process");
                }
                stdout_reader.abort();
                stderr_reader.abort();
                invocation.timed_out = true;
            }
        }

        invocation.duration_ms = start.elapsed().as_millis() as u64;
        debug!(
            command,
            exit_code = ?invocation.exit_code,
            timed_out = invocation.timed_out,
            stdout_len = invocation.stdout.len(),
            stderr_len = invocation.stderr.len(),
            "process invocation complete"
        );
        Ok(invocation)
    }

    /// Short-timeout health probe for an external tool.
    ///
    /// Returns true when the command exits zero within the bound. Used once
    /// per run to decide whether the assistant is usable at all.
    pub async fn preflight(&self, command: &str, args: &[String], wait: Duration) -> bool {
        match self.invoke(command, args, Path::new("."), wait).await {
            Ok(invocation) => !invocation.timed_out && invocation.exit_code == Some(0),
            Err(_) => false,
        }
    }
}

/// Spawn a task draining one output stream line-by-line into a capped buffer.
/// Lines past the cap are consumed but dropped so the child never blocks on a
/// full pipe.
fn spawn_stream_reader<R>(stream: R, max_bytes: usize) -> JoinHandle<String>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buffer = String::new();
        let mut truncated = false;
        let reader = BufReader::new(stream);
        let mut lines = reader.lines();

        while let Ok(Some(line)) = lines.next_line().await {
            if buffer.len() + line.len() < max_bytes {
                buffer.push_str(&line);
                buffer.push('\n');
            } else if !truncated {
                buffer.push_str("... (output truncated)\n");
                truncated = true;
            }
        }

        buffer
    })
}

/// Join a reader task, tolerating abort/panic with an empty buffer
async fn join_reader(handle: JoinHandle<String>) -> String {
    handle.await.unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn test_invoke_captures_stdout() {
        let invoker = ProcessInvoker::new();
        let invocation = invoker
            .invoke("sh", &sh("echo hello"), Path::new("."), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(invocation.exit_code, Some(0));
        assert!(!invocation.timed_out);
        assert_eq!(invocation.analysis_text().unwrap().trim(), "hello");
    }

    #[tokio::test]
    async fn test_invoke_prefers_stdout_over_stderr() {
        let invoker = ProcessInvoker::new();
        let invocation = invoker
            .invoke(
                "sh",
                &sh("echo out; echo err 1>&2"),
                Path::new("."),
                Duration::from_secs(5),
            )
            .await
            .unwrap();

        assert_eq!(invocation.analysis_text().unwrap().trim(), "out");
        assert_eq!(invocation.stderr.trim(), "err");
    }

    #[tokio::test]
    async fn test_invoke_falls_back_to_stderr() {
        let invoker = ProcessInvoker::new();
        let invocation = invoker
            .invoke(
                "sh",
                &sh("echo only-err 1>&2"),
                Path::new("."),
                Duration::from_secs(5),
            )
            .await
            .unwrap();

        assert_eq!(invocation.analysis_text().unwrap().trim(), "only-err");
    }

    #[tokio::test]
    async fn test_invoke_detects_empty_output() {
        let invoker = ProcessInvoker::new();
        let invocation = invoker
            .invoke("sh", &sh("true"), Path::new("."), Duration::from_secs(5))
            .await
            .unwrap();

        assert!(invocation.is_empty_output());
        assert_eq!(invocation.exit_code, Some(0));
    }

    #[tokio::test]
    async fn test_invoke_nonzero_exit_is_not_an_error() {
        let invoker = ProcessInvoker::new();
        let invocation = invoker
            .invoke("sh", &sh("echo bad; exit 3"), Path::new("."), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(invocation.exit_code, Some(3));
        assert_eq!(invocation.analysis_text().unwrap().trim(), "bad");
    }

    #[tokio::test]
    async fn test_invoke_kills_on_timeout() {
        let invoker = ProcessInvoker::new();
        let start = Instant::now();
        let invocation = invoker
            .invoke("sh", &sh("sleep 30"), Path::new("."), Duration::from_millis(300))
            .await
            .unwrap();

        assert!(invocation.timed_out);
        assert!(invocation.exit_code.is_none());
        // Must return near the bound, not after the child would have finished
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_invoke_missing_command_is_error() {
        let invoker = ProcessInvoker::new();
        let result = invoker
            .invoke(
                "definitely-not-a-real-command-9472",
                &[],
                Path::new("."),
                Duration::from_secs(5),
            )
            .await;

        assert!(matches!(result, Err(CoreError::Command(_))));
    }

    #[tokio::test]
    async fn test_invoke_drains_large_output_without_deadlock() {
        let invoker = ProcessInvoker::new().with_config(InvokerConfig {
            max_output_bytes: 4096,
        });
        // Interleaved writes on both streams, well past pipe buffer sizes
        let invocation = invoker
            .invoke(
                "sh",
                &sh("i=0; while [ $i -lt 5000 ]; do echo line-$i; echo err-$i 1>&2; i=$((i+1)); done"),
                Path::new("."),
                Duration::from_secs(30),
            )
            .await
            .unwrap();

        assert_eq!(invocation.exit_code, Some(0));
        assert!(invocation.stdout.contains("output truncated"));
        assert!(invocation.stdout.len() < 8192);
    }

    #[tokio::test]
    async fn test_preflight_success_and_failure() {
        let invoker = ProcessInvoker::new();
        assert!(
            invoker
                .preflight("sh", &sh("exit 0"), Duration::from_secs(5))
                .await
        );
        assert!(
            !invoker
                .preflight("sh", &sh("exit 1"), Duration::from_secs(5))
                .await
        );
        assert!(
            !invoker
                .preflight("sh", &sh("sleep 30"), Duration::from_millis(200))
                .await
        );
        assert!(
            !invoker
                .preflight("no-such-tool-5912", &[], Duration::from_secs(2))
                .await
        );
    }
}
