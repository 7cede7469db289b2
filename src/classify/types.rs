use crate::ingest::{DocumentFile, RawRow};
use crate::item::{ColumnMapping, ImportIssue, ImportItem, SubjectType};
use crate::rules::names::normalize_name;
use crate::rules::tax_id::classify_tax_id;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A registered customer as seen by classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerReference {
    pub name: String,
    /// Digits only
    pub cpf_cnpj: String,
}

/// A registered product as seen by classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductReference {
    pub name: String,
    pub code: String,
    pub unit: String,
}

/// The reference catalog given to the classifier and the local rules
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSnapshot {
    pub customers: Vec<CustomerReference>,
    pub products: Vec<ProductReference>,
}

impl ReferenceSnapshot {
    pub fn customer_by_tax_id(&self, raw: &str) -> Option<&CustomerReference> {
        let id = classify_tax_id(raw).ok()?;
        self.customers.iter().find(|c| c.cpf_cnpj == id.digits)
    }

    pub fn customer_by_name(&self, name: &str) -> Option<&CustomerReference> {
        let key = normalize_name(name);
        if key.is_empty() {
            return None;
        }
        self.customers.iter().find(|c| normalize_name(&c.name) == key)
    }

    /// Tax id first, then exact normalized name
    pub fn resolve_customer(
        &self,
        name: Option<&str>,
        tax_id: Option<&str>,
    ) -> Option<&CustomerReference> {
        tax_id
            .and_then(|t| self.customer_by_tax_id(t))
            .or_else(|| name.and_then(|n| self.customer_by_name(n)))
    }

    pub fn product_by_code(&self, code: &str) -> Option<&ProductReference> {
        let code = code.trim();
        self.products.iter().find(|p| p.code == code)
    }
}

/// Input of one classifier call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationRequest {
    pub subject: SubjectType,
    #[serde(skip)]
    pub instructions: String,
    /// Header labels in file order; empty for documents
    pub columns: Vec<String>,
    pub sampled_rows: Vec<RawRow>,
    pub references: ReferenceSnapshot,
    #[serde(skip)]
    pub document: Option<DocumentFile>,
}

/// One row as classified by a classifier, before status derivation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedRow {
    pub row: u32,
    /// Filled by classifiers that read documents
    #[serde(default)]
    pub original_data: Option<RawRow>,
    #[serde(default)]
    pub mapped_data: BTreeMap<String, String>,
    #[serde(default)]
    pub issues: Vec<ImportIssue>,
    #[serde(default)]
    pub needs_entity_creation: bool,
    #[serde(default)]
    pub matched_reference_name: Option<String>,
}

impl From<ImportItem> for ClassifiedRow {
    fn from(item: ImportItem) -> Self {
        Self {
            row: item.row,
            original_data: Some(item.original_data),
            mapped_data: item.mapped_data,
            issues: item.issues,
            needs_entity_creation: item.needs_entity_creation,
            matched_reference_name: item.matched_reference_name,
        }
    }
}

impl ClassifiedRow {
    /// Turn into an item, deriving status from the issues
    pub fn into_item(self, original_data: RawRow) -> ImportItem {
        let mut item = ImportItem::new(original_data, self.mapped_data, self.issues);
        item.needs_entity_creation = self.needs_entity_creation;
        item.matched_reference_name = self.matched_reference_name;
        item
    }
}

/// Output of one classifier call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResponse {
    pub column_mapping: Vec<ColumnMapping>,
    pub items: Vec<ClassifiedRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ReferenceSnapshot {
        ReferenceSnapshot {
            customers: vec![CustomerReference {
                name: "José da Silva".to_string(),
                cpf_cnpj: "12345678901".to_string(),
            }],
            products: vec![],
        }
    }

    #[test]
    fn test_resolve_customer_prefers_tax_id() {
        let refs = snapshot();
        let found = refs.resolve_customer(Some("Someone Else"), Some("123.456.789-01"));
        assert_eq!(found.map(|c| c.name.as_str()), Some("José da Silva"));
    }

    #[test]
    fn test_resolve_customer_by_normalized_name() {
        let refs = snapshot();
        assert!(refs.resolve_customer(Some("  jose  DA silva "), None).is_some());
        assert!(refs.resolve_customer(Some("Maria"), Some("999")).is_none());
    }

    #[test]
    fn test_response_defaults() {
        let response: ClassificationResponse = serde_json::from_str(
            r#"{"columnMapping": [{"sourceColumn": "Nome", "canonicalField": "name", "confidence": 0.9}],
                "items": [{"row": 1, "mappedData": {"name": "Ana"}}]}"#,
        )
        .unwrap();
        assert_eq!(response.items[0].issues.len(), 0);
        assert!(response.items[0].original_data.is_none());
    }
}
