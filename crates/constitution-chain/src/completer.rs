use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{ChainError, Completer, CompleterConfig, Completion, ProcessSpawner};

/// Completer backed by the `claude` CLI in print mode
pub struct ClaudeCompleter {
    binary_path: PathBuf,
    config: CompleterConfig,
}

impl ClaudeCompleter {
    pub fn new(config: CompleterConfig) -> Self {
        Self {
            binary_path: PathBuf::from("claude"),
            config,
        }
    }

    pub fn with_binary_path(mut self, path: PathBuf) -> Self {
        self.binary_path = path;
        self
    }

    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }
}

#[async_trait]
impl Completer for ClaudeCompleter {
    fn name(&self) -> &str {
        "Claude"
    }

    async fn is_available(&self) -> bool {
        Command::new(&self.binary_path)
            .arg("--version")
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    async fn complete(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<Completion, ChainError> {
        debug!(
            completer = self.name(),
            prompt_len = prompt.len(),
            "Requesting completion"
        );

        let mut args = vec!["--print"];

        if let Some(ref model) = self.config.model {
            args.push("--model");
            args.push(model);
        }

        // Prompts starting with '-' must not be read as options
        args.push("--");
        args.push(prompt);

        let output = ProcessSpawner::spawn(&self.binary_path, &args, &self.config, cancel).await?;
        check_exit(self.name(), output)
    }
}

/// Completer that runs an arbitrary command, passing the prompt as the
/// final argument and reading the completion from stdout
pub struct CommandCompleter {
    binary_path: PathBuf,
    args: Vec<String>,
    config: CompleterConfig,
}

impl CommandCompleter {
    pub fn new(binary_path: PathBuf, args: Vec<String>, config: CompleterConfig) -> Self {
        Self {
            binary_path,
            args,
            config,
        }
    }

    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }
}

#[async_trait]
impl Completer for CommandCompleter {
    fn name(&self) -> &str {
        "Command"
    }

    async fn is_available(&self) -> bool {
        which::which(&self.binary_path).is_ok()
    }

    async fn complete(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<Completion, ChainError> {
        debug!(
            completer = self.name(),
            binary = %self.binary_path.display(),
            prompt_len = prompt.len(),
            "Requesting completion"
        );

        let mut args: Vec<&str> = self.args.iter().map(String::as_str).collect();
        args.push(prompt);

        let output = ProcessSpawner::spawn(&self.binary_path, &args, &self.config, cancel).await?;
        check_exit(self.name(), output)
    }
}

fn check_exit(name: &str, output: Completion) -> Result<Completion, ChainError> {
    if output.success() {
        return Ok(output);
    }
    let detail = if output.stderr.is_empty() {
        String::from("no stderr output")
    } else {
        output.stderr
    };
    Err(ChainError::ExecutionFailed(format!(
        "{} exited with code {}: {}",
        name, output.exit_code, detail
    )))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_command_completer_appends_prompt() {
        let completer = CommandCompleter::new(
            PathBuf::from("echo"),
            vec!["model says:".to_string()],
            CompleterConfig::new(std::env::temp_dir()),
        );
        let out = completer
            .complete("-n looks like a flag", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out.text, "model says: -n looks like a flag");
    }

    #[tokio::test]
    async fn test_command_completer_nonzero_exit_is_error() {
        let completer = CommandCompleter::new(
            PathBuf::from("sh"),
            vec!["-c".to_string(), "echo rate limited 1>&2; exit 1".to_string()],
            CompleterConfig::new(std::env::temp_dir()),
        );
        let err = completer
            .complete("ignored", &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            ChainError::ExecutionFailed(msg) => {
                assert!(msg.contains("code 1"));
                assert!(msg.contains("rate limited"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let completer = CommandCompleter::new(
            PathBuf::from("definitely-not-a-real-model-cli"),
            vec![],
            CompleterConfig::default(),
        );
        assert!(!completer.is_available().await);
    }

    #[tokio::test]
    async fn test_non_executable_file_is_unavailable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("model-cli");
        std::fs::write(&script, "#!/bin/sh\necho hi\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o644)).unwrap();

        let completer =
            CommandCompleter::new(script.clone(), vec![], CompleterConfig::new(dir.path().into()));
        assert!(!completer.is_available().await);

        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert!(completer.is_available().await);
    }
}
