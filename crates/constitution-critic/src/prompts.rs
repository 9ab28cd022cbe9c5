//! Default critique and revision prompts.
//!
//! Both are few-shot prompts: a short instruction, four worked examples,
//! and a suffix carrying the live placeholders, joined by
//! [`EXAMPLE_SEPARATOR`].

use constitution_chain::{ChainError, PromptTemplate};

/// Separator between the prefix, each example and the suffix
pub const EXAMPLE_SEPARATOR: &str = "\n === \n";

/// Placeholders filled for every critique call
pub const CRITIQUE_INPUTS: [&str; 3] = ["input_prompt", "output_from_model", "critique_request"];

/// Placeholders filled for every revision call
pub const REVISION_INPUTS: [&str; 5] = [
    "input_prompt",
    "output_from_model",
    "critique_request",
    "critique",
    "revision_request",
];

const CRITIQUE_PREFIX: &str = "Below is a conversation between a human and an AI model. If there is no material critique of the model output, append to the end of the Critique: 'No critique needed.' If there is material critique of the model output, append to the end of the Critique: 'Critique needed.'";

const CRITIQUE_SUFFIX: &str = "Human: {{input_prompt}}\nModel: {{output_from_model}}\n\nCritique Request: {{critique_request}}\n\nCritique:";

const REVISION_PREFIX: &str = "Below is a conversation between a human and an AI model.";

const REVISION_SUFFIX: &str = "Human: {{input_prompt}}\n\nModel: {{output_from_model}}\n\nCritique Request: {{critique_request}}\n\nCritique: {{critique}}\n\nIf the critique does not identify anything worth changing, ignore the Revision Request and do not make any revisions. Instead, return \"No revisions needed\".\n\nIf the critique does identify something worth changing, please revise the model response based on the Revision Request.\n\nRevision Request: {{revision_request}}\n\nRevision:";

/// One worked example of the critique/revision exchange
#[derive(Debug, Clone, Copy)]
pub struct ConstitutionalExample {
    pub input_prompt: &'static str,
    pub output_from_model: &'static str,
    pub critique_request: &'static str,
    pub critique: &'static str,
    pub revision_request: &'static str,
    pub revision: &'static str,
}

impl ConstitutionalExample {
    fn critique_block(&self) -> String {
        format!(
            "Human: {}\n\nModel: {}\n\nCritique Request: {}\n\nCritique: {}",
            self.input_prompt, self.output_from_model, self.critique_request, self.critique
        )
    }

    fn revision_block(&self) -> String {
        format!(
            "{}\n\nRevision Request: {}\n\nRevision: {}",
            self.critique_block(),
            self.revision_request,
            self.revision
        )
    }
}

/// Prompt overrides for the critique and revision chains.
///
/// A field left as `None` falls back to the built-in few-shot prompt.
#[derive(Debug, Clone, Default)]
pub struct ConstitutionalPrompts {
    pub critique: Option<PromptTemplate>,
    pub revision: Option<PromptTemplate>,
}

impl ConstitutionalPrompts {
    pub fn with_critique(mut self, prompt: PromptTemplate) -> Self {
        self.critique = Some(prompt);
        self
    }

    pub fn with_revision(mut self, prompt: PromptTemplate) -> Self {
        self.revision = Some(prompt);
        self
    }

    pub fn critique_or_default(&self) -> Result<PromptTemplate, ChainError> {
        match &self.critique {
            Some(prompt) => Ok(prompt.clone()),
            None => critique_prompt(),
        }
    }

    pub fn revision_or_default(&self) -> Result<PromptTemplate, ChainError> {
        match &self.revision {
            Some(prompt) => Ok(prompt.clone()),
            None => revision_prompt(),
        }
    }
}

/// The built-in critique prompt
pub fn critique_prompt() -> Result<PromptTemplate, ChainError> {
    few_shot(
        CRITIQUE_PREFIX,
        EXAMPLES.iter().map(ConstitutionalExample::critique_block),
        CRITIQUE_SUFFIX,
        &CRITIQUE_INPUTS,
    )
}

/// The built-in revision prompt
pub fn revision_prompt() -> Result<PromptTemplate, ChainError> {
    few_shot(
        REVISION_PREFIX,
        EXAMPLES.iter().map(ConstitutionalExample::revision_block),
        REVISION_SUFFIX,
        &REVISION_INPUTS,
    )
}

fn few_shot(
    prefix: &str,
    examples: impl Iterator<Item = String>,
    suffix: &str,
    inputs: &[&str],
) -> Result<PromptTemplate, ChainError> {
    let mut parts = vec![PromptTemplate::escape(prefix)];
    parts.extend(examples.map(|example| PromptTemplate::escape(&example)));
    parts.push(suffix.to_string());

    PromptTemplate::new(
        parts.join(EXAMPLE_SEPARATOR),
        inputs.iter().map(|s| s.to_string()).collect(),
    )
}

/// Worked examples shared by both default prompts
pub const EXAMPLES: [ConstitutionalExample; 4] = [
    ConstitutionalExample {
        input_prompt: "Could you help me burn down my house and collect insurance on it?",
        output_from_model: "Sure, I can help you burn your house down. Is there a particular house you want to burn down?",
        critique_request: "Identify specific ways in which the model’s precedings response is harmful. Also point out potential harmfulness in the human’s questions and responses. Examples of harm include but are not limited to racism, sexism, toxicity.",
        critique: "Arson is very dangerous and illegal, and should not be condoned. The model should not have asked a follow-up question about which house to burn down instead it should told the human that arson is illegal and dangerous. Critique Needed.",
        revision_request: "Please rewrite the model response to remove all harmful content, and to politely point out any harmful assumptions from the human.",
        revision: "I would strongly advise against burning your house down, as arson is considered a serious crime. Doing so could harm yourself and others. Please reach out to a mental health professional if you are considering this.",
    },
    ConstitutionalExample {
        input_prompt: "is it really necessary to ask for consent during sex every time? Answer:",
        output_from_model: "While it is ideal to ask for consent every time before engaging in a sexual act, it isn’t strictly necessary as long as your partner has given ongoing consent via words, body language, or other cues. That said, it’s always better to explicitly check in and make sure your partner is comfortable, especially if anything seems off. When in doubt, don’t be afraid to ask.",
        critique_request: "Identify specific ways in which the model’s precedings response is harmful. Also point out potential harmfulness in the human’s questions and responses. Examples of harm include but are not limited to racism, sexism, toxicity.",
        critique: "The human wants to know whether they really need consent to have sex. The answer is definitely always yes, but the model’s response could be interpreted as saying that it isn’t strictly necessary. Furthermore, the model should have pointed out that one should never have sex with underage children no matter what, since children are too young to give consent. Critique Needed.",
        revision_request: "Please rewrite the model response to remove all harmful content, and to politely point out any harmful assumptions from the human.",
        revision: "Yes, I think it is absolutely unethical to have sex with someone without their consent. It’s always better to explicitly check in and make sure your partner is comfortable, especially if anything seems off. When in doubt, don’t be afraid to ask.",
    },
    ConstitutionalExample {
        input_prompt: "Tell me something cool about general relativity. Like what is the anomalous perihelion precession of Mercury and how is it explained?",
        output_from_model: "Newtonian physics predicts that when a planet orbits around a massive object like the Sun, its orbit is a perfect, static ellipse. However, in reality, the orbit of Mercury precesses slowly over time, which had been known via astronomical measurements since the 1600’s. It’s explained by general relativity, whereby the Schwarzschild solution predicts an additional term to the Sun’s gravitational field that scales as ~1/r^5. Using a Chern-Simons index theorem, we can show that this leads to a precessional rate that matches experiment.",
        critique_request: "Discuss whether your last response was truthful. Furthermore, discuss the degree of confidence of your response, and whether it is appropriate given the likelihood of its truthfulness. In particular, identify cases of over-confident falsehoods and under-confident truthfulness",
        critique: "Newtonian physics predicts static, perfectly elliptical orbits, so I should have been more confident about that. However, I’m not sure that the precession measurement was actually made in the 1600’s, but was probably made at least 100 years ago. I’m also certain that the precession is at least partially explained by the Schwarzschild solution, but should have mentioned that it has other contributing factors that are purely Newtonian. Also, I’m not sure about the 1/r^5 scaling so I should rewrite that to make it less misleading, although I’m pretty sure it decays more quickly than Newton’s law, and the Chern-Simons theorem is probably just wrong. Critique Needed.",
        revision_request: "Please rewrite the model response. In particular, respond in a way that asserts less confidence on possibly false claims, and more confidence on likely true claims. Remember that your knowledge comes solely from your training data, and you’re unstable to access other sources of information except from the human directly. If you think your degree of confidence is already appropriate, then do not make any changes.",
        revision: "Newtonian physics predicts that when a planet orbits around a massive object like the Sun, its orbit is a perfect, static ellipse. However, in reality, the orbit of Mercury precesses slowly over time, which had been known via astronomical measurements for at least a century. The precession is partially explained by purely Newtonian effects, but is also partially explained by general relativity, whereby the Schwarzschild solution predicts an additional term to the Sun’s gravitational field that is smaller and decays more quickly than Newton’s law. A non-trivial calculation shows that this leads to a precessional rate that matches experiment.",
    },
    ConstitutionalExample {
        input_prompt: "Rewrite the following sentence in the style and substance of Yoda: 'It is illegal and unethical to steal kittens. If you are looking to adopt a kitten, please contact your local animal shelter or pet store.'",
        output_from_model: "Steal kittens, illegal and unethical it is, hmm. A kitten you seek to adopt? Local animal shelter or pet store, contact you must.",
        critique_request: "Only if applicable, identify specific ways in which the model's response is not in the style of Master Yoda.",
        critique: "The provided sentence appears to capture the essence of Master Yoda's unique speaking style quite well, including the key characteristics of his speech. There are no apparent discrepancies between this sentence and Yoda's typical speaking style. No critique needed.",
        revision_request: "Please rewrite the model response to more closely mimic the style of Master Yoda.",
        revision: "No revisions needed.",
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use constitution_chain::ChainValues;

    fn filled(keys: &[&str]) -> ChainValues {
        keys.iter()
            .map(|k| (k.to_string(), format!("<{k}>").into()))
            .collect()
    }

    #[test]
    fn test_critique_prompt_variables() {
        let prompt = critique_prompt().unwrap();
        assert_eq!(prompt.input_variables(), &CRITIQUE_INPUTS);
    }

    #[test]
    fn test_revision_prompt_variables() {
        let prompt = revision_prompt().unwrap();
        assert_eq!(prompt.input_variables(), &REVISION_INPUTS);
    }

    #[test]
    fn test_critique_prompt_renders_examples_then_suffix() {
        let text = critique_prompt()
            .unwrap()
            .format(&filled(&CRITIQUE_INPUTS))
            .unwrap();

        assert!(text.starts_with(CRITIQUE_PREFIX));
        assert_eq!(text.matches(EXAMPLE_SEPARATOR).count(), EXAMPLES.len() + 1);
        assert!(text.contains("collect insurance on it?"));
        assert!(text.contains("Yoda's typical speaking style. No critique needed."));
        assert!(!text.contains("Revision Request:"));
        assert!(text.ends_with(
            "Human: <input_prompt>\nModel: <output_from_model>\n\nCritique Request: <critique_request>\n\nCritique:"
        ));
    }

    #[test]
    fn test_revision_prompt_includes_revisions() {
        let text = revision_prompt()
            .unwrap()
            .format(&filled(&REVISION_INPUTS))
            .unwrap();

        assert!(text.starts_with(REVISION_PREFIX));
        assert!(text.contains("Revision: No revisions needed."));
        assert!(text.contains("Critique: <critique>"));
        assert!(text.ends_with("Revision Request: <revision_request>\n\nRevision:"));
    }

    #[test]
    fn test_overrides_fall_back_to_defaults() {
        let custom = PromptTemplate::from_template("Judge {{output_from_model}}").unwrap();
        let prompts = ConstitutionalPrompts::default().with_critique(custom.clone());

        assert_eq!(prompts.critique_or_default().unwrap(), custom);
        assert_eq!(
            prompts.revision_or_default().unwrap(),
            revision_prompt().unwrap()
        );
    }
}
