use super::types::{ImportIssue, ItemStatus, Severity};

/// Status is the worst severity among the remaining issues.
pub fn derive_status(issues: &[ImportIssue]) -> ItemStatus {
    if issues.iter().any(|i| i.severity == Severity::Error) {
        ItemStatus::Error
    } else if !issues.is_empty() {
        ItemStatus::NeedsCorrection
    } else {
        ItemStatus::Ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_issues_is_ready() {
        assert_eq!(derive_status(&[]), ItemStatus::Ready);
    }

    #[test]
    fn test_warning_needs_correction() {
        let issues = vec![ImportIssue::fixable("unit", "synonym", "metro", "m")];
        assert_eq!(derive_status(&issues), ItemStatus::NeedsCorrection);
    }

    #[test]
    fn test_any_error_wins() {
        let issues = vec![
            ImportIssue::fixable("unit", "synonym", "metro", "m"),
            ImportIssue::error("cpf_cnpj", "invalid", "123"),
        ];
        assert_eq!(derive_status(&issues), ItemStatus::Error);
    }
}
