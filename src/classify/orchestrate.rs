use std::collections::{BTreeMap, HashSet};
use tracing::info;

use super::local::RowValidator;
use super::types::{ClassificationRequest, ClassificationResponse, ReferenceSnapshot};
use super::{Classifier, ClassifyError};
use crate::ingest::{ImportSource, RawRow};
use crate::item::{ColumnMapping, ImportItem, SubjectType};
use crate::rules::subject_fields;
use crate::template::PromptEngine;

/// Result of the mapping stage for a whole upload
#[derive(Debug, Clone)]
pub struct MappingOutcome {
    pub column_mapping: Vec<ColumnMapping>,
    /// Every row, in ascending row order
    pub items: Vec<ImportItem>,
    /// Rows classified by the classifier
    pub sampled_rows: usize,
    /// Rows classified by the local rules with the returned mapping
    pub replicated_rows: usize,
}

/// Reject responses that do not fit the subject or the sample
fn validate_response(
    subject: SubjectType,
    source: &ImportSource,
    sample: &[RawRow],
    response: &ClassificationResponse,
) -> Result<(), ClassifyError> {
    let known_fields: HashSet<&str> = subject_fields(subject).iter().map(|f| f.name).collect();
    let columns: HashSet<&str> = source.columns().iter().map(String::as_str).collect();
    let mut seen_fields = HashSet::new();

    for mapping in &response.column_mapping {
        if !known_fields.contains(mapping.canonical_field.as_str()) {
            return Err(ClassifyError::Malformed(format!(
                "field '{}' does not belong to {}",
                mapping.canonical_field, subject
            )));
        }
        if !source.is_document() && !columns.contains(mapping.source_column.as_str()) {
            return Err(ClassifyError::Malformed(format!(
                "column '{}' does not exist in the file",
                mapping.source_column
            )));
        }
        if !(0.0..=1.0).contains(&mapping.confidence) {
            return Err(ClassifyError::Malformed(format!(
                "confidence {} for '{}' is outside [0, 1]",
                mapping.confidence, mapping.source_column
            )));
        }
        if !seen_fields.insert(mapping.canonical_field.as_str()) {
            return Err(ClassifyError::Malformed(format!(
                "field '{}' is mapped twice",
                mapping.canonical_field
            )));
        }
    }

    let mut seen_rows = HashSet::new();
    for item in &response.items {
        if !seen_rows.insert(item.row) {
            return Err(ClassifyError::Malformed(format!("row {} classified twice", item.row)));
        }
    }

    if source.is_document() {
        if response.items.is_empty() {
            return Err(ClassifyError::EmptyInput);
        }
        return Ok(());
    }

    let expected: HashSet<u32> = sample.iter().map(|r| r.row).collect();
    if let Some(unknown) = seen_rows.difference(&expected).min() {
        return Err(ClassifyError::Malformed(format!("row {} was not sampled", unknown)));
    }
    if let Some(missing) = expected.difference(&seen_rows).min() {
        return Err(ClassifyError::Malformed(format!("row {} was not classified", missing)));
    }

    Ok(())
}

/// Map and validate an upload with the built-in instructions
pub async fn map_and_validate(
    classifier: &dyn Classifier,
    subject: SubjectType,
    source: &ImportSource,
    references: &ReferenceSnapshot,
    sample_size: usize,
) -> Result<MappingOutcome, ClassifyError> {
    let instructions = PromptEngine::new()?.render_instructions(subject)?;
    map_and_validate_with(classifier, subject, source, references, sample_size, instructions).await
}

/// Map and validate an upload with caller-supplied instructions.
///
/// Makes exactly one classifier call. Either every row gets an item or an
/// error is returned.
pub async fn map_and_validate_with(
    classifier: &dyn Classifier,
    subject: SubjectType,
    source: &ImportSource,
    references: &ReferenceSnapshot,
    sample_size: usize,
    instructions: String,
) -> Result<MappingOutcome, ClassifyError> {
    let rows = source.rows();
    if !source.is_document() && rows.is_empty() {
        return Err(ClassifyError::EmptyInput);
    }

    let sample_len = sample_size.max(1).min(rows.len());
    let (sample, rest) = rows.split_at(sample_len);

    let request = ClassificationRequest {
        subject,
        instructions,
        columns: source.columns().to_vec(),
        sampled_rows: sample.to_vec(),
        references: references.clone(),
        document: match source {
            ImportSource::Document(document) => Some(document.clone()),
            ImportSource::Spreadsheet(_) => None,
        },
    };

    let response = classifier.classify(&request).await?;
    validate_response(subject, source, sample, &response)?;

    let originals: BTreeMap<u32, &RawRow> = sample.iter().map(|r| (r.row, r)).collect();
    let ClassificationResponse {
        column_mapping,
        items: classified,
    } = response;

    let mut items: Vec<ImportItem> = classified
        .into_iter()
        .map(|row| {
            let original = match originals.get(&row.row) {
                Some(original) => (*original).clone(),
                None => row
                    .original_data
                    .clone()
                    .unwrap_or_else(|| RawRow::new(row.row)),
            };
            row.into_item(original)
        })
        .collect();

    let validator = RowValidator::new(subject, &column_mapping, references);
    items.extend(rest.iter().map(|row| validator.classify(row)));
    items.sort_by_key(|item| item.row);

    let sampled_rows = items.len() - rest.len();
    info!(
        classifier = classifier.name(),
        %subject,
        sampled = sampled_rows,
        replicated = rest.len(),
        mapped_columns = column_mapping.len(),
        "Mapping stage complete"
    );

    Ok(MappingOutcome {
        column_mapping,
        items,
        sampled_rows,
        replicated_rows: rest.len(),
    })
}
