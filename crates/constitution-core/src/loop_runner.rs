use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use constitution_chain::{
    CancellationToken, Chain, ChainError, ChainValues, Completer, LlmChain, Memory,
    PromptTemplate, SimpleMemory, TEXT_KEY,
};
use constitution_critic::{ConstitutionalPrinciple, ConstitutionalPrompts, CritiqueVerdict};
use constitution_logging::{truncate, LogEvent, Logger};

use crate::context::RunContext;
use crate::error::{LoopError, Stage};
use crate::outcome::{LoopResult, CRITIQUES_AND_REVISIONS_KEY, INITIAL_OUTPUT_KEY, OUTPUT_KEY};

const PREVIEW_CHARS: usize = 100;

/// Runs a primary chain, then critiques and optionally revises its answer
/// once per principle, in order.
///
/// Each principle sees the response left by the one before it. The loop
/// holds no per-run state, so one instance can serve concurrent runs as
/// long as its sub-chains can.
pub struct CritiqueRevisionLoop {
    primary: Arc<dyn Chain>,
    input_template: PromptTemplate,
    critique: Arc<dyn Chain>,
    revision: Arc<dyn Chain>,
    principles: Vec<ConstitutionalPrinciple>,
    return_intermediate_steps: bool,
    logger: Option<Arc<Logger>>,
    memory: SimpleMemory,
}

impl CritiqueRevisionLoop {
    /// `input_template` renders the primary chain's inputs into the
    /// `input_prompt` shown to the critique and revision chains.
    pub fn new(
        primary: Arc<dyn Chain>,
        input_template: PromptTemplate,
        critique: Arc<dyn Chain>,
        revision: Arc<dyn Chain>,
        principles: Vec<ConstitutionalPrinciple>,
    ) -> Self {
        Self {
            primary,
            input_template,
            critique,
            revision,
            principles,
            return_intermediate_steps: false,
            logger: None,
            memory: SimpleMemory,
        }
    }

    /// Build critique and revision chains over `completer`, using the
    /// override prompts where given and the built-in few-shot prompts
    /// otherwise.
    pub fn from_llm(
        completer: Arc<dyn Completer>,
        primary: LlmChain,
        principles: Vec<ConstitutionalPrinciple>,
        prompts: &ConstitutionalPrompts,
    ) -> Result<Self, ChainError> {
        let critique = LlmChain::new(completer.clone(), prompts.critique_or_default()?);
        let revision = LlmChain::new(completer, prompts.revision_or_default()?);
        let input_template = primary.prompt().clone();

        Ok(Self::new(
            Arc::new(primary),
            input_template,
            Arc::new(critique),
            Arc::new(revision),
            principles,
        ))
    }

    pub fn with_return_intermediate_steps(mut self, enabled: bool) -> Self {
        self.return_intermediate_steps = enabled;
        self
    }

    pub fn with_logger(mut self, logger: Arc<Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn principles(&self) -> &[ConstitutionalPrinciple] {
        &self.principles
    }

    fn emit(&self, event: LogEvent) {
        if let Some(ref logger) = self.logger {
            logger.log(&event);
        }
    }

    /// Run the loop to completion.
    ///
    /// Any sub-chain failure aborts the whole run; revisions gathered so far
    /// are discarded.
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        inputs: ChainValues,
    ) -> Result<LoopResult, LoopError> {
        let mut active: Option<&str> = None;
        let result = self.run_principles(cancel, inputs, &mut active).await;

        if let Err(ref e) = result {
            warn!(error = %e, principle = ?active, "Critique/revision loop failed");
            self.emit(LogEvent::ErrorEncountered {
                principle: active.map(String::from),
                error: e.to_string(),
            });
        }
        result
    }

    async fn run_principles<'s>(
        &'s self,
        cancel: &CancellationToken,
        inputs: ChainValues,
        active: &mut Option<&'s str>,
    ) -> Result<LoopResult, LoopError> {
        let started_at = Instant::now();

        self.emit(LogEvent::LoopStarted {
            principles: self.principles.len(),
            input_preview: preview_inputs(&inputs),
        });

        let initial = self
            .call_for_text(Stage::Primary, &self.primary, cancel, inputs.clone())
            .await?;

        self.emit(LogEvent::PrimaryCompleted {
            output_preview: truncate(&initial, PREVIEW_CHARS),
            duration_secs: started_at.elapsed().as_secs_f64(),
        });

        let input_prompt = self
            .input_template
            .format(&inputs)
            .map_err(LoopError::Prompt)?;

        let mut ctx = RunContext::new(input_prompt, initial, started_at);

        for (index, principle) in self.principles.iter().enumerate() {
            *active = Some(principle.name.as_str());

            if cancel.is_cancelled() {
                return Err(LoopError::SubChain {
                    stage: Stage::Critique,
                    source: ChainError::Cancelled,
                });
            }

            self.emit(LogEvent::CritiqueStarted {
                index,
                principle: principle.name.clone(),
            });
            debug!(index, principle = %principle.name, "Requesting critique");

            let raw_critique = self
                .call_for_text(
                    Stage::Critique,
                    &self.critique,
                    cancel,
                    critique_inputs(&ctx, principle),
                )
                .await?;

            let verdict = CritiqueVerdict::from_raw(&raw_critique);

            self.emit(LogEvent::CritiqueCompleted {
                index,
                principle: principle.name.clone(),
                verdict: verdict.short_description().to_string(),
                critique: verdict.critique().map(String::from),
            });

            let critique = match verdict {
                CritiqueVerdict::NoCritique => continue,
                CritiqueVerdict::NoRevision { critique } => {
                    ctx.record_unrevised(critique);
                    continue;
                }
                CritiqueVerdict::Revise { critique } => critique,
            };

            let revision_started = Instant::now();
            let revision = self
                .call_for_text(
                    Stage::Revision,
                    &self.revision,
                    cancel,
                    revision_inputs(&ctx, principle, &critique),
                )
                .await?;
            let revision = revision.trim().to_string();

            self.emit(LogEvent::RevisionCompleted {
                index,
                principle: principle.name.clone(),
                revision_preview: truncate(&revision, PREVIEW_CHARS),
                duration_secs: revision_started.elapsed().as_secs_f64(),
            });

            ctx.record_revision(critique, revision);
        }
        *active = None;

        info!(
            principles = self.principles.len(),
            critiques = ctx.trace.len(),
            revisions = ctx.revisions(),
            "Critique/revision loop completed"
        );
        self.emit(LogEvent::LoopCompleted {
            critiques: ctx.trace.len(),
            revisions: ctx.revisions(),
            duration_secs: ctx.total_duration().as_secs_f64(),
        });

        Ok(ctx.into_result(self.return_intermediate_steps))
    }

    async fn call_for_text(
        &self,
        stage: Stage,
        chain: &Arc<dyn Chain>,
        cancel: &CancellationToken,
        inputs: ChainValues,
    ) -> Result<String, LoopError> {
        let mut outputs = chain
            .call(cancel, inputs)
            .await
            .map_err(|source| LoopError::SubChain { stage, source })?;

        match outputs.remove(TEXT_KEY) {
            Some(serde_json::Value::String(text)) => Ok(text),
            Some(_) => Err(LoopError::TypeMismatch {
                stage,
                key: TEXT_KEY.to_string(),
            }),
            None => Err(LoopError::MissingOutputField {
                stage,
                key: TEXT_KEY.to_string(),
            }),
        }
    }
}

fn critique_inputs(ctx: &RunContext, principle: &ConstitutionalPrinciple) -> ChainValues {
    let mut inputs = ChainValues::new();
    inputs.insert("input_prompt".into(), ctx.input_prompt.clone().into());
    inputs.insert("output_from_model".into(), ctx.current.clone().into());
    inputs.insert(
        "critique_request".into(),
        principle.critique_request.clone().into(),
    );
    inputs
}

fn revision_inputs(
    ctx: &RunContext,
    principle: &ConstitutionalPrinciple,
    critique: &str,
) -> ChainValues {
    let mut inputs = critique_inputs(ctx, principle);
    inputs.insert("critique".into(), critique.into());
    inputs.insert(
        "revision_request".into(),
        principle.revision_request.clone().into(),
    );
    inputs
}

fn preview_inputs(inputs: &ChainValues) -> String {
    let mut keys: Vec<&String> = inputs.keys().collect();
    keys.sort();
    let joined = keys
        .into_iter()
        .map(|key| match &inputs[key] {
            serde_json::Value::String(s) => format!("{}={}", key, s),
            other => format!("{}={}", key, other),
        })
        .collect::<Vec<_>>()
        .join(" ");
    truncate(&joined, PREVIEW_CHARS)
}

#[async_trait]
impl Chain for CritiqueRevisionLoop {
    async fn call(
        &self,
        cancel: &CancellationToken,
        inputs: ChainValues,
    ) -> Result<ChainValues, ChainError> {
        let result = self.run(cancel, inputs).await?;
        Ok(result.into_values())
    }

    fn input_keys(&self) -> Vec<String> {
        self.primary.input_keys()
    }

    fn output_keys(&self) -> Vec<String> {
        if self.return_intermediate_steps {
            vec![
                OUTPUT_KEY.to_string(),
                INITIAL_OUTPUT_KEY.to_string(),
                CRITIQUES_AND_REVISIONS_KEY.to_string(),
            ]
        } else {
            vec![OUTPUT_KEY.to_string()]
        }
    }

    fn memory(&self) -> &dyn Memory {
        &self.memory
    }
}
