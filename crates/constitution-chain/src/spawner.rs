use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::{ChainError, Completion, CompleterConfig};

/// Utility for spawning model processes
pub struct ProcessSpawner;

impl ProcessSpawner {
    /// Spawn a process and capture its output.
    ///
    /// The child is killed if `cancel` fires or the configured timeout
    /// elapses before it exits.
    pub async fn spawn(
        binary: &Path,
        args: &[&str],
        config: &CompleterConfig,
        cancel: &CancellationToken,
    ) -> Result<Completion, ChainError> {
        if cancel.is_cancelled() {
            return Err(ChainError::Cancelled);
        }

        let start = Instant::now();

        debug!(
            binary = %binary.display(),
            arg_count = args.len(),
            working_dir = %config.working_dir.display(),
            "Spawning model process"
        );

        let mut cmd = Command::new(binary);
        cmd.args(args)
            .current_dir(&config.working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        for (key, value) in &config.env_vars {
            cmd.env(key, value);
        }

        let child = cmd.spawn()?;

        let (stdout, stderr, status) = tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!("Model process cancelled");
                return Err(ChainError::Cancelled);
            }
            result = collect_with_timeout(child, config.timeout) => result?,
        };

        let duration = start.elapsed();

        debug!(
            exit_code = status.code().unwrap_or(-1),
            duration_ms = duration.as_millis(),
            "Model process completed"
        );

        Ok(Completion::new(
            stdout,
            stderr,
            status.code().unwrap_or(-1),
            duration,
        ))
    }
}

async fn collect_with_timeout(
    child: Child,
    timeout: Option<Duration>,
) -> Result<(String, String, ExitStatus), ChainError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, collect(child))
            .await
            .map_err(|_| ChainError::Timeout(limit))?,
        None => collect(child).await,
    }
}

async fn collect(mut child: Child) -> Result<(String, String, ExitStatus), ChainError> {
    let stdout_handle = child
        .stdout
        .take()
        .ok_or_else(|| ChainError::ExecutionFailed("stdout not captured".into()))?;
    let stderr_handle = child
        .stderr
        .take()
        .ok_or_else(|| ChainError::ExecutionFailed("stderr not captured".into()))?;

    let mut stdout_reader = BufReader::new(stdout_handle).lines();
    let mut stderr_reader = BufReader::new(stderr_handle).lines();

    let mut stdout = String::new();
    let mut stderr = String::new();
    let mut stderr_done = false;

    // Read both streams concurrently
    loop {
        tokio::select! {
            biased;

            result = stdout_reader.next_line() => {
                match result {
                    Ok(Some(line)) => {
                        trace!(line = %line, "stdout");
                        push_line(&mut stdout, &line);
                    }
                    Ok(None) => {
                        // stdout closed, drain stderr
                        while !stderr_done {
                            let Ok(Some(line)) = stderr_reader.next_line().await else {
                                break;
                            };
                            trace!(line = %line, "stderr");
                            push_line(&mut stderr, &line);
                        }
                        break;
                    }
                    Err(e) => {
                        return Err(ChainError::ExecutionFailed(format!(
                            "Failed to read stdout: {}",
                            e
                        )));
                    }
                }
            }
            result = stderr_reader.next_line(), if !stderr_done => {
                match result {
                    Ok(Some(line)) => {
                        trace!(line = %line, "stderr");
                        push_line(&mut stderr, &line);
                    }
                    // A closed stream stays ready; stop polling it
                    Ok(None) => stderr_done = true,
                    Err(e) => {
                        return Err(ChainError::ExecutionFailed(format!(
                            "Failed to read stderr: {}",
                            e
                        )));
                    }
                }
            }
        }
    }

    let status = child.wait().await?;
    Ok((stdout, stderr, status))
}

fn push_line(buf: &mut String, line: &str) {
    if !buf.is_empty() {
        buf.push('\n');
    }
    buf.push_str(line);
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config() -> CompleterConfig {
        CompleterConfig::new(std::env::temp_dir())
    }

    #[tokio::test]
    async fn test_captures_stdout_and_exit_code() {
        let cancel = CancellationToken::new();
        let out = ProcessSpawner::spawn(
            &PathBuf::from("sh"),
            &["-c", "echo first; echo second; echo oops 1>&2; exit 3"],
            &config(),
            &cancel,
        )
        .await
        .unwrap();

        assert_eq!(out.text, "first\nsecond");
        assert_eq!(out.stderr, "oops");
        assert_eq!(out.exit_code, 3);
    }

    #[tokio::test]
    async fn test_cancelled_before_spawn() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = ProcessSpawner::spawn(&PathBuf::from("sh"), &["-c", "true"], &config(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::Cancelled));
    }

    #[tokio::test]
    async fn test_cancel_kills_running_process() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let err = ProcessSpawner::spawn(&PathBuf::from("sh"), &["-c", "sleep 10"], &config(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_timeout() {
        let cancel = CancellationToken::new();
        let config = config().with_timeout(Duration::from_millis(50));
        let err = ProcessSpawner::spawn(&PathBuf::from("sh"), &["-c", "sleep 10"], &config, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::Timeout(_)));
    }

    /// User plus system CPU ticks consumed by the calling thread
    #[cfg(target_os = "linux")]
    fn thread_cpu_ticks() -> u64 {
        let stat = std::fs::read_to_string("/proc/thread-self/stat").unwrap();
        let fields: Vec<&str> = stat[stat.rfind(')').unwrap() + 2..].split(' ').collect();
        fields[11].parse::<u64>().unwrap() + fields[12].parse::<u64>().unwrap()
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_early_stderr_close_does_not_spin() {
        let cancel = CancellationToken::new();
        let before = thread_cpu_ticks();
        let out = ProcessSpawner::spawn(
            &PathBuf::from("sh"),
            &["-c", "exec 2>&-; sleep 1; echo hi"],
            &config(),
            &cancel,
        )
        .await
        .unwrap();
        let ticks = thread_cpu_ticks() - before;

        assert_eq!(out.text, "hi");
        assert!(out.stderr.is_empty());
        assert!(ticks < 20, "reader burned {ticks} CPU ticks while waiting");
    }
}
