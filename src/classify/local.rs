use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use super::types::{ClassificationRequest, ClassificationResponse, ClassifiedRow, ReferenceSnapshot};
use super::{Classifier, ClassifyError};
use crate::ingest::RawRow;
use crate::item::{ColumnMapping, ImportIssue, ImportItem, SubjectType};
use crate::matching::ReferenceIndex;
use crate::rules::currency::{format_amount, format_quantity, is_plain_decimal, parse_amount};
use crate::rules::dates::{parse_date, to_iso};
use crate::rules::names::canonical_product_name;
use crate::rules::schema::header_confidence;
use crate::rules::states::{check_state, StateCheck};
use crate::rules::tax_id::{CNPJ_DIGITS, CPF_DIGITS};
use crate::rules::units::{check_unit, UnitCheck};
use crate::rules::{classify_tax_id, fields, subject_fields, FieldKind};

/// Map source columns to canonical fields using the header synonyms.
///
/// Highest confidence wins; each column and each field is used at most once.
pub fn map_headers(subject: SubjectType, columns: &[String]) -> Vec<ColumnMapping> {
    let specs = subject_fields(subject);

    let mut candidates: Vec<(f64, usize, usize)> = Vec::new();
    for (col_idx, column) in columns.iter().enumerate() {
        for (field_idx, spec) in specs.iter().enumerate() {
            let confidence = header_confidence(spec, column);
            if confidence > 0.0 {
                candidates.push((confidence, col_idx, field_idx));
            }
        }
    }
    candidates.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.1.cmp(&b.1))
            .then(a.2.cmp(&b.2))
    });

    let mut used_columns = HashSet::new();
    let mut used_fields = HashSet::new();
    let mut mapping = Vec::new();
    for (confidence, col_idx, field_idx) in candidates {
        if used_columns.contains(&col_idx) || used_fields.contains(&field_idx) {
            continue;
        }
        used_columns.insert(col_idx);
        used_fields.insert(field_idx);
        mapping.push((
            col_idx,
            ColumnMapping {
                source_column: columns[col_idx].clone(),
                canonical_field: specs[field_idx].name.to_string(),
                confidence,
            },
        ));
    }

    mapping.sort_by_key(|(col_idx, _)| *col_idx);
    mapping.into_iter().map(|(_, m)| m).collect()
}

/// Check one value against the rule for its field kind
fn check_value(kind: FieldKind, field: &str, value: &str) -> Option<ImportIssue> {
    match kind {
        FieldKind::TaxId => match classify_tax_id(value) {
            Ok(id) if id.digits == value => None,
            Ok(id) => Some(ImportIssue::fixable(
                field,
                "Tax id contains formatting characters",
                value,
                id.digits,
            )),
            Err(found) => Some(ImportIssue::error(
                field,
                format!(
                    "Tax id must have {} (CPF) or {} (CNPJ) digits, found {}",
                    CPF_DIGITS, CNPJ_DIGITS, found
                ),
                value,
            )),
        },
        FieldKind::State => match check_state(value) {
            StateCheck::Canonical => None,
            StateCheck::Abbreviate(abbr) => Some(ImportIssue::fixable(
                field,
                "State should be the two-letter abbreviation",
                value,
                abbr,
            )),
            StateCheck::Unknown => Some(ImportIssue::warning(field, "Unknown state", value)),
        },
        FieldKind::Unit => match check_unit(value) {
            UnitCheck::Canonical => None,
            UnitCheck::Synonym(canonical) => Some(ImportIssue::fixable(
                field,
                "Unit of measure is not in canonical form",
                value,
                canonical,
            )),
            UnitCheck::Unknown => Some(ImportIssue::warning(field, "Unknown unit of measure", value)),
        },
        FieldKind::Money => match parse_amount(value) {
            None => Some(ImportIssue::error(field, "Amount is not a valid number", value)),
            Some(amount) if amount < 0.0 => {
                Some(ImportIssue::error(field, "Amount must not be negative", value))
            }
            Some(_) if is_plain_decimal(value) => None,
            Some(amount) => Some(ImportIssue::fixable(
                field,
                "Amount is not a plain decimal",
                value,
                format_amount(amount),
            )),
        },
        FieldKind::Quantity => match parse_amount(value) {
            None => Some(ImportIssue::error(field, "Quantity is not a valid number", value)),
            Some(quantity) if quantity <= 0.0 => {
                Some(ImportIssue::error(field, "Quantity must be positive", value))
            }
            Some(_) if is_plain_decimal(value) => None,
            Some(quantity) => Some(ImportIssue::fixable(
                field,
                "Quantity is not a plain number",
                value,
                format_quantity(quantity),
            )),
        },
        FieldKind::Date => match parse_date(value) {
            None => Some(ImportIssue::error(field, "Date is not recognized", value)),
            Some(date) => {
                let iso = to_iso(date);
                (iso != value)
                    .then(|| ImportIssue::fixable(field, "Date should be written as YYYY-MM-DD", value, iso))
            }
        },
        FieldKind::ProductName => {
            let canonical = canonical_product_name(value);
            (canonical != value).then(|| {
                ImportIssue::fixable(field, "Number marker should be written as Nº", value, canonical)
            })
        }
        FieldKind::Text | FieldKind::ProductReference | FieldKind::CustomerReference => None,
    }
}

/// A line discount may not exceed quantity times unit price
fn check_discount(mapped: &BTreeMap<String, String>) -> Option<ImportIssue> {
    let amount_of = |field: &str| mapped.get(field).and_then(|v| parse_amount(v));
    let raw_discount = mapped.get(fields::DISCOUNT)?;
    let discount = parse_amount(raw_discount)?;
    let subtotal = amount_of(fields::QUANTITY)? * amount_of(fields::UNIT_PRICE)?;

    ((discount * 100.0).round() > (subtotal * 100.0).round()).then(|| {
        ImportIssue::error(
            fields::DISCOUNT,
            format!("Discount exceeds the line subtotal of {}", format_amount(subtotal)),
            raw_discount,
        )
    })
}

/// Local rules for one subject, with the product catalog indexed once
pub struct RowValidator<'a> {
    subject: SubjectType,
    mapping: &'a [ColumnMapping],
    references: &'a ReferenceSnapshot,
    products: ReferenceIndex,
}

impl<'a> RowValidator<'a> {
    pub fn new(
        subject: SubjectType,
        mapping: &'a [ColumnMapping],
        references: &'a ReferenceSnapshot,
    ) -> Self {
        Self {
            subject,
            mapping,
            references,
            products: ReferenceIndex::new(references.products.iter().map(|p| p.name.as_str())),
        }
    }

    /// Apply the column mapping to a row
    pub fn map_row(&self, row: &RawRow) -> BTreeMap<String, String> {
        self.mapping
            .iter()
            .filter_map(|m| {
                row.text(&m.source_column)
                    .map(|value| (m.canonical_field.clone(), value))
            })
            .collect()
    }

    pub fn classify(&self, row: &RawRow) -> ImportItem {
        let mut mapped = self.map_row(row);
        let mut issues = Vec::new();

        for spec in subject_fields(self.subject) {
            let value = mapped
                .get(spec.name)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty());
            match value {
                Some(value) => issues.extend(check_value(spec.kind, spec.name, value)),
                None if spec.required => {
                    issues.push(ImportIssue::error(spec.name, "Required field is missing", ""))
                }
                None => {}
            }
        }

        let mut needs_entity_creation = false;
        let mut matched_reference_name = None;

        match self.subject {
            SubjectType::Customers => {
                if let Some(raw) = mapped.get(fields::CPF_CNPJ).cloned() {
                    if let Ok(id) = classify_tax_id(&raw) {
                        mapped.insert(fields::PERSON_TYPE.to_string(), id.person_type.as_str().to_string());
                        matched_reference_name = self
                            .references
                            .customer_by_tax_id(&id.digits)
                            .map(|c| c.name.clone());
                    }
                }
            }
            SubjectType::Products => {
                matched_reference_name = mapped
                    .get(fields::CODE)
                    .and_then(|code| self.references.product_by_code(code))
                    .map(|p| p.name.clone());
            }
            SubjectType::Sales => {
                if let Some(product_name) = mapped.get(fields::PRODUCT_NAME).cloned() {
                    match self.products.find(&product_name) {
                        Some(found) => {
                            let product = &self.references.products[found.index];
                            debug!(row = row.row, input = %product_name, matched = %product.name, kind = ?found.kind, "Product resolved");
                            mapped.insert(fields::PRODUCT_CODE.to_string(), product.code.clone());
                            matched_reference_name = Some(product.name.clone());
                        }
                        None => issues.push(ImportIssue::error(
                            fields::PRODUCT_NAME,
                            "Product not found in catalog (reference not found)",
                            &product_name,
                        )),
                    }
                }

                issues.extend(check_discount(&mapped));

                let customer_name = mapped.get(fields::CUSTOMER_NAME).map(String::as_str);
                let customer_tax_id = mapped.get(fields::CUSTOMER_CPF_CNPJ).map(String::as_str);
                if customer_name.is_some() || customer_tax_id.is_some() {
                    needs_entity_creation = self
                        .references
                        .resolve_customer(customer_name, customer_tax_id)
                        .is_none();
                }
            }
        }

        let mut item = ImportItem::new(row.clone(), mapped, issues);
        item.needs_entity_creation = needs_entity_creation;
        item.matched_reference_name = matched_reference_name;
        item
    }
}

/// Classify one row with the local rules
pub fn classify_row(
    subject: SubjectType,
    row: &RawRow,
    mapping: &[ColumnMapping],
    references: &ReferenceSnapshot,
) -> ImportItem {
    RowValidator::new(subject, mapping, references).classify(row)
}

/// Offline classifier: header synonyms for the mapping, local rules for the rows
#[derive(Debug, Clone, Default)]
pub struct LocalClassifier;

impl LocalClassifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Classifier for LocalClassifier {
    fn name(&self) -> &str {
        "local"
    }

    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<ClassificationResponse, ClassifyError> {
        if request.document.is_some() {
            return Err(ClassifyError::DocumentUnsupported);
        }

        let columns: Vec<String> = if request.columns.is_empty() {
            let mut seen = Vec::new();
            for row in &request.sampled_rows {
                for key in row.values.keys() {
                    if !seen.contains(key) {
                        seen.push(key.clone());
                    }
                }
            }
            seen
        } else {
            request.columns.clone()
        };

        let column_mapping = map_headers(request.subject, &columns);
        let validator = RowValidator::new(request.subject, &column_mapping, &request.references);
        let items = request
            .sampled_rows
            .iter()
            .map(|row| ClassifiedRow::from(validator.classify(row)))
            .collect();

        Ok(ClassificationResponse {
            column_mapping,
            items,
        })
    }
}
