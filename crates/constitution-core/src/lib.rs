mod context;
mod error;
mod loop_runner;
mod outcome;

pub use error::{LoopError, Stage};
pub use loop_runner::CritiqueRevisionLoop;
pub use outcome::{
    CritiqueRevision, LoopResult, CRITIQUES_AND_REVISIONS_KEY, INITIAL_OUTPUT_KEY, OUTPUT_KEY,
};
