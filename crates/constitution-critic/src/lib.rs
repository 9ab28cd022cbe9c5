mod principle;
pub mod prompts;
mod verdict;

pub use principle::{ConstitutionalPrinciple, UnknownPrinciple, DEFAULT_PRINCIPLE_NAME};
pub use prompts::{critique_prompt, revision_prompt, ConstitutionalPrompts};
pub use verdict::{parse_critique, CritiqueVerdict, NO_CRITIQUE_NEEDED, REVISION_REQUEST_MARKER};
