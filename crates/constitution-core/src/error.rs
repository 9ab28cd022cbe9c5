use constitution_chain::ChainError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which sub-chain of the loop an error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Primary,
    Critique,
    Revision,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Primary => write!(f, "primary"),
            Stage::Critique => write!(f, "critique"),
            Stage::Revision => write!(f, "revision"),
        }
    }
}

#[derive(Error, Debug)]
pub enum LoopError {
    #[error("The {stage} chain returned no '{key}' field")]
    MissingOutputField { stage: Stage, key: String },

    #[error("The {stage} chain returned a non-string '{key}' field")]
    TypeMismatch { stage: Stage, key: String },

    #[error("The {stage} chain failed: {source}")]
    SubChain {
        stage: Stage,
        #[source]
        source: ChainError,
    },

    #[error("Failed to format input prompt: {0}")]
    Prompt(#[source] ChainError),
}

impl LoopError {
    pub fn stage(&self) -> Option<Stage> {
        match self {
            LoopError::MissingOutputField { stage, .. }
            | LoopError::TypeMismatch { stage, .. }
            | LoopError::SubChain { stage, .. } => Some(*stage),
            LoopError::Prompt(_) => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            LoopError::SubChain {
                source: ChainError::Cancelled,
                ..
            }
        )
    }
}

impl From<LoopError> for ChainError {
    /// Sub-chain failures come back out exactly as the sub-chain raised them
    fn from(err: LoopError) -> Self {
        match err {
            LoopError::SubChain { source, .. } => source,
            LoopError::Prompt(source) => source,
            other => ChainError::Other(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_stage() {
        let err = LoopError::MissingOutputField {
            stage: Stage::Critique,
            key: "text".into(),
        };
        assert_eq!(err.to_string(), "The critique chain returned no 'text' field");
        assert_eq!(err.stage(), Some(Stage::Critique));
    }

    #[test]
    fn test_sub_chain_error_converts_back_unchanged() {
        let err = LoopError::SubChain {
            stage: Stage::Revision,
            source: ChainError::Timeout(std::time::Duration::from_secs(5)),
        };
        assert!(!err.is_cancelled());
        assert!(matches!(ChainError::from(err), ChainError::Timeout(d) if d.as_secs() == 5));
    }

    #[test]
    fn test_cancellation_detected() {
        let err = LoopError::SubChain {
            stage: Stage::Primary,
            source: ChainError::Cancelled,
        };
        assert!(err.is_cancelled());
    }
}
