mod engine;
mod types;

pub use engine::{PromptEngine, TemplateError};
pub use types::{FieldPrompt, PromptContext, SynonymPrompt};
