mod completer;
mod llm_chain;
mod memory;
mod output;
mod prompt;
mod spawner;
mod traits;

pub use completer::{ClaudeCompleter, CommandCompleter};
pub use llm_chain::{LlmChain, TEXT_KEY};
pub use memory::{Memory, SimpleMemory};
pub use output::Completion;
pub use prompt::PromptTemplate;
pub use spawner::ProcessSpawner;
pub use traits::{Chain, ChainError, ChainValues, Completer, CompleterConfig};

pub use tokio_util::sync::CancellationToken;
