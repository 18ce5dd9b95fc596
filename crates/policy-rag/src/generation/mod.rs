//! Decision synthesis and model-output handling

pub mod decision;
pub mod json;
pub mod prompt;

pub use decision::DecisionSynthesizer;
pub use json::{first_object, objects};
pub use prompt::PromptBuilder;
