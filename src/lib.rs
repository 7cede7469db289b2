pub mod autofix;
pub mod classify;
pub mod config;
pub mod ingest;
pub mod item;
pub mod matching;
pub mod reconciliation;
pub mod rules;
pub mod server;
pub mod session;
pub mod store;
pub mod template;
pub mod utils;

// Re-export commonly used types
pub use autofix::{apply_auto_fixes, apply_manual_correction, AutoFixRecord};
pub use classify::{
    classify_row, map_and_validate, Classifier, ClassifyError, LocalClassifier, MappingOutcome,
    ReferenceSnapshot, RemoteClassifier,
};
pub use config::{ClassifierConfig, ClassifierMode, ImporterConfig};
pub use ingest::{parse_spreadsheet, ImportSource, IngestError, ParsedSheet, RawRow};
pub use item::{ColumnMapping, ImportIssue, ImportItem, ItemStatus, Severity, SubjectType};
pub use matching::{find_reference, ReferenceIndex};
pub use reconciliation::{commit_items, CodeAllocator, CommitContext, CommitSummary};
pub use server::ImportDaemonService;
pub use session::{ImportSession, SessionError, SessionRegistry, SessionState};
pub use store::{EntityStore, JsonFileStore, StoreError};
pub use template::{PromptEngine, TemplateError};
