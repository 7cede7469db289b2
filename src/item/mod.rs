mod status;
mod types;

pub use status::derive_status;
pub use types::{
    ColumnMapping, ImportIssue, ImportItem, ItemStatus, Severity, SubjectType,
};
