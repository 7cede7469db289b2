//! Normalization and validation rules.
//!
//! These tables are the single source of truth for the classifier: the
//! prompt sent to the remote service is rendered from them and the local
//! replication routine validates against them, so sampled and non-sampled
//! rows follow the same rules.

pub mod currency;
pub mod dates;
pub mod names;
pub mod schema;
pub mod states;
pub mod tax_id;
pub mod text;
pub mod units;

pub use schema::{field_spec, fields, subject_fields, FieldKind, FieldSpec};
pub use tax_id::{classify_tax_id, PersonType, TaxId};
