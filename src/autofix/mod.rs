use crate::item::{ImportItem, ItemStatus};
use serde::{Deserialize, Serialize};
use tracing::info;

/// One applied correction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoFixRecord {
    pub row: u32,
    pub field: String,
    pub problem: String,
    pub original_value: String,
    pub new_value: String,
}

/// Apply every auto-fixable suggestion on items that need correction.
///
/// Fixed issues are removed and the item status re-derived. Running it
/// again over the same items changes nothing.
pub fn apply_auto_fixes(items: &mut [ImportItem]) -> Vec<AutoFixRecord> {
    let mut records = Vec::new();

    for item in items
        .iter_mut()
        .filter(|item| item.status == ItemStatus::NeedsCorrection)
    {
        let (fixable, remaining): (Vec<_>, Vec<_>) = std::mem::take(&mut item.issues)
            .into_iter()
            .partition(|issue| issue.is_auto_fixable());
        item.issues = remaining;

        if fixable.is_empty() {
            continue;
        }

        for issue in fixable {
            let new_value = issue.suggested_value.unwrap_or_default();
            let original_value = item
                .mapped_data
                .insert(issue.field.clone(), new_value.clone())
                .unwrap_or(issue.current_value);

            info!(
                row = item.row,
                field = %issue.field,
                from = %original_value,
                to = %new_value,
                "Applied auto-fix"
            );

            records.push(AutoFixRecord {
                row: item.row,
                field: issue.field,
                problem: issue.problem,
                original_value,
                new_value,
            });
        }

        item.refresh_status();
    }

    records
}

/// Set a field to an operator-supplied value.
///
/// Clears the issues reported for that field; an empty value removes it.
pub fn apply_manual_correction(item: &mut ImportItem, field: &str, value: &str) {
    let value = value.trim();
    if value.is_empty() {
        item.mapped_data.remove(field);
    } else {
        item.mapped_data.insert(field.to_string(), value.to_string());
    }
    item.issues.retain(|issue| issue.field != field);
    item.refresh_status();

    info!(row = item.row, field, "Applied manual correction");
}
