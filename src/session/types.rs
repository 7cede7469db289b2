use crate::ingest::ImportSource;
use crate::item::{ColumnMapping, ImportItem, ItemStatus, SubjectType};
use crate::reconciliation::CommitSummary;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Lifecycle of an import session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Uploaded,
    Classified,
    /// A commit is writing to the store
    Committing,
    /// At least one commit ran; rows left pending can still be fixed and committed
    Committed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Uploaded => "uploaded",
            SessionState::Classified => "classified",
            SessionState::Committing => "committing",
            SessionState::Committed => "committed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImportSession {
    pub id: String,
    pub workspace: PathBuf,
    pub subject: SubjectType,
    pub file_name: String,
    /// SHA-256 of the uploaded bytes
    pub fingerprint: String,
    pub source: ImportSource,
    pub column_mapping: Vec<ColumnMapping>,
    pub items: Vec<ImportItem>,
    pub state: SessionState,
    pub created_at: String,
    pub last_commit: Option<CommitSummary>,
}

/// Item counts by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub ready: u32,
    pub needs_correction: u32,
    pub error: u32,
}

impl ImportSession {
    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for item in &self.items {
            match item.status {
                ItemStatus::Ready => counts.ready += 1,
                ItemStatus::NeedsCorrection => counts.needs_correction += 1,
                ItemStatus::Error => counts.error += 1,
            }
        }
        counts
    }

    /// Number of source rows; documents have none until classified
    pub fn row_count(&self) -> usize {
        match &self.source {
            ImportSource::Spreadsheet(sheet) => sheet.rows.len(),
            ImportSource::Document(_) => self.items.len(),
        }
    }
}
