use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{Chain, ChainError, ChainValues, Completer, Memory, PromptTemplate, SimpleMemory};

/// Output key under which an [`LlmChain`] returns the completion
pub const TEXT_KEY: &str = "text";

/// Prompt template plus completer: formats the inputs, asks the model,
/// returns the text under [`TEXT_KEY`]
pub struct LlmChain {
    prompt: PromptTemplate,
    completer: Arc<dyn Completer>,
    memory: SimpleMemory,
}

impl LlmChain {
    pub fn new(completer: Arc<dyn Completer>, prompt: PromptTemplate) -> Self {
        Self {
            prompt,
            completer,
            memory: SimpleMemory,
        }
    }

    pub fn prompt(&self) -> &PromptTemplate {
        &self.prompt
    }

    pub fn completer(&self) -> &Arc<dyn Completer> {
        &self.completer
    }
}

#[async_trait]
impl Chain for LlmChain {
    async fn call(
        &self,
        cancel: &CancellationToken,
        inputs: ChainValues,
    ) -> Result<ChainValues, ChainError> {
        let prompt = self.prompt.format(&inputs)?;

        debug!(
            completer = self.completer.name(),
            prompt_len = prompt.len(),
            "Running LLM chain"
        );

        let completion = self.completer.complete(&prompt, cancel).await?;

        info!(
            lines = completion.text_lines(),
            duration_secs = completion.duration.as_secs_f64(),
            "Completion received"
        );

        let mut outputs = ChainValues::new();
        outputs.insert(
            TEXT_KEY.to_string(),
            serde_json::Value::String(completion.text),
        );
        Ok(outputs)
    }

    fn input_keys(&self) -> Vec<String> {
        self.prompt.input_variables().to_vec()
    }

    fn output_keys(&self) -> Vec<String> {
        vec![TEXT_KEY.to_string()]
    }

    fn memory(&self) -> &dyn Memory {
        &self.memory
    }
}
