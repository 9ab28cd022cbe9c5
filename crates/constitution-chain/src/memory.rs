use crate::ChainValues;

/// Conversation state a chain may carry between calls
pub trait Memory: Send + Sync {
    /// Keys this memory contributes to chain inputs
    fn memory_variables(&self) -> Vec<String>;

    /// Values to merge into the next call's inputs
    fn load_memory_variables(&self, inputs: &ChainValues) -> ChainValues;

    /// Record a finished call
    fn save_context(&self, inputs: &ChainValues, outputs: &ChainValues);

    fn clear(&self);
}

/// Stateless memory: remembers nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleMemory;

impl Memory for SimpleMemory {
    fn memory_variables(&self) -> Vec<String> {
        Vec::new()
    }

    fn load_memory_variables(&self, _inputs: &ChainValues) -> ChainValues {
        ChainValues::new()
    }

    fn save_context(&self, _inputs: &ChainValues, _outputs: &ChainValues) {}

    fn clear(&self) {}
}
