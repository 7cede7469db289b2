use crate::ingest::RawRow;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Canonical entity kind an import targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectType {
    Customers,
    Products,
    Sales,
}

impl SubjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectType::Customers => "customers",
            SubjectType::Products => "products",
            SubjectType::Sales => "sales",
        }
    }
}

impl fmt::Display for SubjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubjectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "customers" | "customer" | "clientes" => Ok(SubjectType::Customers),
            "products" | "product" | "produtos" => Ok(SubjectType::Products),
            "sales" | "sale" | "vendas" => Ok(SubjectType::Sales),
            other => Err(format!("Unknown import subject: {}", other)),
        }
    }
}

/// Source column → canonical field, produced once per session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    pub source_column: String,
    pub canonical_field: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// A problem found in one field of one row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportIssue {
    pub field: String,
    pub problem: String,
    #[serde(default)]
    pub current_value: String,
    #[serde(default)]
    pub suggested_value: Option<String>,
    pub severity: Severity,
    #[serde(default)]
    pub can_auto_fix: bool,
}

impl ImportIssue {
    /// An error that blocks the row and cannot be fixed automatically
    pub fn error(field: &str, problem: impl Into<String>, current_value: &str) -> Self {
        Self {
            field: field.to_string(),
            problem: problem.into(),
            current_value: current_value.to_string(),
            suggested_value: None,
            severity: Severity::Error,
            can_auto_fix: false,
        }
    }

    /// A warning carrying a replacement value the operator can apply in bulk
    pub fn fixable(
        field: &str,
        problem: impl Into<String>,
        current_value: &str,
        suggested_value: impl Into<String>,
    ) -> Self {
        Self {
            field: field.to_string(),
            problem: problem.into(),
            current_value: current_value.to_string(),
            suggested_value: Some(suggested_value.into()),
            severity: Severity::Warning,
            can_auto_fix: true,
        }
    }

    /// A warning that needs an operator decision
    pub fn warning(field: &str, problem: impl Into<String>, current_value: &str) -> Self {
        Self {
            field: field.to_string(),
            problem: problem.into(),
            current_value: current_value.to_string(),
            suggested_value: None,
            severity: Severity::Warning,
            can_auto_fix: false,
        }
    }

    pub fn is_auto_fixable(&self) -> bool {
        self.can_auto_fix && self.suggested_value.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Ready,
    NeedsCorrection,
    Error,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Ready => "ready",
            ItemStatus::NeedsCorrection => "needs_correction",
            ItemStatus::Error => "error",
        }
    }
}

/// One classified row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportItem {
    pub row: u32,
    pub original_data: RawRow,
    pub mapped_data: BTreeMap<String, String>,
    pub status: ItemStatus,
    #[serde(default)]
    pub issues: Vec<ImportIssue>,
    #[serde(default)]
    pub needs_entity_creation: bool,
    #[serde(default)]
    pub matched_reference_name: Option<String>,
    /// Stored or settled as a duplicate by an earlier commit
    #[serde(default)]
    pub committed: bool,
}

impl ImportItem {
    /// Build an item and derive its status from the issues
    pub fn new(
        original_data: RawRow,
        mapped_data: BTreeMap<String, String>,
        issues: Vec<ImportIssue>,
    ) -> Self {
        let mut item = Self {
            row: original_data.row,
            original_data,
            mapped_data,
            status: ItemStatus::Ready,
            issues,
            needs_entity_creation: false,
            matched_reference_name: None,
            committed: false,
        };
        item.refresh_status();
        item
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.mapped_data
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Re-derive status from the remaining issues
    pub fn refresh_status(&mut self) {
        self.status = super::status::derive_status(&self.issues);
    }
}
