//! Column mapping and per-row validation.
//!
//! One classifier call covers the sampled rows of a session; every row past
//! the sample goes through the local rules with the returned mapping.

mod local;
mod orchestrate;
mod remote;
mod types;

pub use local::{classify_row, map_headers, LocalClassifier, RowValidator};
pub use orchestrate::{map_and_validate, map_and_validate_with, MappingOutcome};
pub use remote::RemoteClassifier;
pub use types::{
    ClassificationRequest, ClassificationResponse, ClassifiedRow, CustomerReference,
    ProductReference, ReferenceSnapshot,
};

use crate::config::{ClassifierConfig, ClassifierMode};
use crate::template::TemplateError;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("Nothing to classify")]
    EmptyInput,

    #[error("Classification service unavailable: {0}")]
    Unavailable(String),

    #[error("Classifier response is malformed: {0}")]
    Malformed(String),

    #[error("This classifier cannot read documents")]
    DocumentUnsupported,

    #[error("Classifier is not configured: {0}")]
    NotConfigured(String),

    #[error("Template error: {0}")]
    TemplateError(#[from] TemplateError),
}

/// Produces the column mapping and the classified sample of a session
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<ClassificationResponse, ClassifyError>;
}

/// Build the classifier selected by configuration
pub fn classifier_from_config(config: &ClassifierConfig) -> Result<Box<dyn Classifier>, ClassifyError> {
    match config.mode {
        ClassifierMode::Local => Ok(Box::new(LocalClassifier::new())),
        ClassifierMode::Remote => Ok(Box::new(RemoteClassifier::from_config(config)?)),
    }
}
