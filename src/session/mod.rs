mod registry;
mod types;

pub use registry::SessionRegistry;
pub use types::{ImportSession, SessionState, StatusCounts};

use crate::classify::ClassifyError;
use crate::config::{read_config, write_config, ConfigError, ImporterConfig};
use crate::ingest::IngestError;
use crate::store::{init_store, StoreError};
use crate::template::TemplateError;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Cannot {operation} a session that is {}", .state.as_str())]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("Row {0} is not part of this session")]
    ItemNotFound(u32),

    #[error("Row {0} was already committed")]
    ItemCommitted(u32),

    #[error("Ingest error: {0}")]
    IngestError(#[from] IngestError),

    #[error("Classification error: {0}")]
    ClassifyError(#[from] ClassifyError),

    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    #[error("Config error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Template error: {0}")]
    TemplateError(#[from] TemplateError),
}

/// What `init_workspace` had to create
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InitOutcome {
    pub created_config: bool,
    pub created_store: bool,
}

/// Prepare `.importer/` with a default config and an empty store
pub async fn init_workspace(workspace: &Path) -> Result<InitOutcome, SessionError> {
    let created_config = if read_config(workspace).await?.is_none() {
        write_config(workspace, &ImporterConfig::default()).await?;
        true
    } else {
        false
    };
    let created_store = init_store(workspace).await?;

    Ok(InitOutcome {
        created_config,
        created_store,
    })
}
