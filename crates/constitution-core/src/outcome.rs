use constitution_chain::ChainValues;
use serde::{Deserialize, Serialize};

pub const OUTPUT_KEY: &str = "output";
pub const INITIAL_OUTPUT_KEY: &str = "initial_output";
pub const CRITIQUES_AND_REVISIONS_KEY: &str = "critiques_and_revisions";

/// One principle's entry in the trace. `revision` is empty when the
/// critique asked for no change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CritiqueRevision {
    pub critique: String,
    pub revision: String,
}

impl CritiqueRevision {
    pub fn new(critique: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            critique: critique.into(),
            revision: revision.into(),
        }
    }

    pub fn was_revised(&self) -> bool {
        !self.revision.is_empty()
    }
}

/// The final result of one critique/revision run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopResult {
    /// Response after every principle has been applied
    pub output: String,
    /// Primary chain's response, when intermediate steps are requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_output: Option<String>,
    /// Ordered trace, when intermediate steps are requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critiques_and_revisions: Option<Vec<CritiqueRevision>>,
}

impl LoopResult {
    /// Number of principles that produced a revision
    pub fn revision_count(&self) -> usize {
        self.critiques_and_revisions
            .as_deref()
            .map(|trace| trace.iter().filter(|pair| pair.was_revised()).count())
            .unwrap_or(0)
    }

    /// Flatten into chain output values
    pub fn into_values(self) -> ChainValues {
        let mut values = ChainValues::new();
        values.insert(OUTPUT_KEY.to_string(), self.output.into());
        if let Some(initial) = self.initial_output {
            values.insert(INITIAL_OUTPUT_KEY.to_string(), initial.into());
        }
        if let Some(trace) = self.critiques_and_revisions {
            values.insert(
                CRITIQUES_AND_REVISIONS_KEY.to_string(),
                serde_json::to_value(trace).unwrap_or_default(),
            );
        }
        values
    }
}
