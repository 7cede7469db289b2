//! Turning reviewed items into stored entities.

mod codes;
mod commit;
mod context;

pub use codes::CodeAllocator;
pub use commit::{commit_items, CommitError, CommitSummary, RowFailure};
pub use context::CommitContext;
