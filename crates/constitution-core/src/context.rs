use std::time::{Duration, Instant};

use crate::{CritiqueRevision, LoopResult};

/// Mutable state owned by a single run of the loop
#[derive(Debug)]
pub(crate) struct RunContext {
    /// Formatted primary prompt, shown to the critique and revision chains
    pub input_prompt: String,
    /// Primary chain's response
    pub initial_output: String,
    /// Response the next principle will critique
    pub current: String,
    pub trace: Vec<CritiqueRevision>,
    started_at: Instant,
}

impl RunContext {
    pub fn new(input_prompt: String, initial_output: String, started_at: Instant) -> Self {
        Self {
            input_prompt,
            current: initial_output.clone(),
            initial_output,
            trace: Vec::new(),
            started_at,
        }
    }

    /// Record a critique that asked for no change
    pub fn record_unrevised(&mut self, critique: String) {
        self.trace.push(CritiqueRevision {
            critique,
            revision: String::new(),
        });
    }

    /// Record a revision; it becomes the response the next principle sees
    pub fn record_revision(&mut self, critique: String, revision: String) {
        self.current = revision.clone();
        self.trace.push(CritiqueRevision { critique, revision });
    }

    pub fn revisions(&self) -> usize {
        self.trace.iter().filter(|pair| pair.was_revised()).count()
    }

    pub fn total_duration(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn into_result(self, intermediate_steps: bool) -> LoopResult {
        if intermediate_steps {
            LoopResult {
                output: self.current,
                initial_output: Some(self.initial_output),
                critiques_and_revisions: Some(self.trace),
            }
        } else {
            LoopResult {
                output: self.current,
                initial_output: None,
                critiques_and_revisions: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revision_replaces_current() {
        let mut ctx = RunContext::new("prompt".into(), "draft".into(), Instant::now());
        ctx.record_unrevised("fine. no critique needed".into());
        assert_eq!(ctx.current, "draft");

        ctx.record_revision("too long".into(), "short".into());
        assert_eq!(ctx.current, "short");
        assert_eq!(ctx.revisions(), 1);

        let result = ctx.into_result(true);
        assert_eq!(result.output, "short");
        assert_eq!(result.initial_output.as_deref(), Some("draft"));
        assert_eq!(result.critiques_and_revisions.map(|t| t.len()), Some(2));
    }

    #[test]
    fn test_result_hides_trace_unless_requested() {
        let mut ctx = RunContext::new("prompt".into(), "draft".into(), Instant::now());
        ctx.record_revision("x".into(), "y".into());
        let result = ctx.into_result(false);
        assert_eq!(result.output, "y");
        assert!(result.initial_output.is_none());
        assert!(result.critiques_and_revisions.is_none());
    }
}
