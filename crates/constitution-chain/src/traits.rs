use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::{Completion, Memory};

/// Named values flowing into and out of a chain
pub type ChainValues = HashMap<String, serde_json::Value>;

/// Errors that can occur while calling a chain
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Failed to spawn model process: {0}")]
    SpawnFailed(#[from] std::io::Error),

    #[error("Model call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Model call was cancelled")]
    Cancelled,

    #[error("Model call failed: {0}")]
    ExecutionFailed(String),

    #[error("Missing input variable: {0}")]
    MissingInput(String),

    #[error("Invalid prompt template: {0}")]
    Template(String),

    #[error("{0}")]
    Other(String),
}

/// Configuration for process-backed completers
#[derive(Debug, Clone)]
pub struct CompleterConfig {
    /// Working directory for the model process
    pub working_dir: PathBuf,
    /// Optional timeout per call (None = no limit)
    pub timeout: Option<std::time::Duration>,
    /// Additional environment variables
    pub env_vars: HashMap<String, String>,
    /// Model to use (if the backend supports it)
    pub model: Option<String>,
}

impl Default for CompleterConfig {
    fn default() -> Self {
        Self {
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            timeout: None,
            env_vars: HashMap::new(),
            model: None,
        }
    }
}

impl CompleterConfig {
    pub fn new(working_dir: PathBuf) -> Self {
        Self {
            working_dir,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_env(mut self, key: String, value: String) -> Self {
        self.env_vars.insert(key, value);
        self
    }
}

/// Turns a fully formatted prompt into model text
#[async_trait]
pub trait Completer: Send + Sync {
    /// Human-readable name of the backend (e.g., "Claude")
    fn name(&self) -> &str;

    /// Complete the prompt. Implementations must give up promptly once
    /// `cancel` fires.
    async fn complete(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<Completion, ChainError>;

    /// Check if the backend is reachable on this system
    async fn is_available(&self) -> bool;
}

/// The call contract every chain satisfies: named inputs in, named outputs out
#[async_trait]
pub trait Chain: Send + Sync {
    /// Run the chain. The token is forwarded untouched to any nested calls.
    async fn call(
        &self,
        cancel: &CancellationToken,
        inputs: ChainValues,
    ) -> Result<ChainValues, ChainError>;

    /// Keys this chain expects in its inputs
    fn input_keys(&self) -> Vec<String>;

    /// Keys this chain produces
    fn output_keys(&self) -> Vec<String>;

    /// Memory attached to this chain
    fn memory(&self) -> &dyn Memory;
}
