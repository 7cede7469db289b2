use crate::item::SubjectType;
use crate::matching::MIN_SHARED_TOKENS;
use crate::rules::{names, schema::FieldSpec, states::STATES, subject_fields, tax_id, units::UNIT_SYNONYMS};
use serde::Serialize;

/// A canonical field as described to the classifier
#[derive(Debug, Clone, Serialize)]
pub struct FieldPrompt {
    pub name: String,
    pub kind: String,
    pub required: bool,
    pub description: String,
    pub synonyms: String,
}

impl From<&FieldSpec> for FieldPrompt {
    fn from(spec: &FieldSpec) -> Self {
        Self {
            name: spec.name.to_string(),
            kind: serde_json::to_value(spec.kind)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default(),
            required: spec.required,
            description: spec.description.to_string(),
            synonyms: spec.synonyms.join(", "),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SynonymPrompt {
    pub canonical: String,
    pub synonyms: String,
}

/// Context for classifier instruction templates
/// Placeholders: {{subject}}, {{#each fields}}, {{#each units}}, {{#each states}},
/// {{cpf_digits}}, {{cnpj_digits}}, {{number_marker}}, {{min_shared_tokens}},
/// {{min_token_chars}}
#[derive(Debug, Clone, Serialize)]
pub struct PromptContext {
    pub subject: String,
    pub fields: Vec<FieldPrompt>,
    pub units: Vec<SynonymPrompt>,
    pub states: Vec<SynonymPrompt>,
    pub cpf_digits: usize,
    pub cnpj_digits: usize,
    pub number_marker: String,
    pub min_shared_tokens: usize,
    pub min_token_chars: usize,
}

impl PromptContext {
    /// Build the context from the shared rules tables
    pub fn for_subject(subject: SubjectType) -> Self {
        Self {
            subject: subject.to_string(),
            fields: subject_fields(subject).iter().map(FieldPrompt::from).collect(),
            units: UNIT_SYNONYMS
                .iter()
                .map(|(canonical, synonyms)| SynonymPrompt {
                    canonical: canonical.to_string(),
                    synonyms: synonyms.join(", "),
                })
                .collect(),
            states: STATES
                .iter()
                .map(|(abbr, name)| SynonymPrompt {
                    canonical: abbr.to_string(),
                    synonyms: name.to_string(),
                })
                .collect(),
            cpf_digits: tax_id::CPF_DIGITS,
            cnpj_digits: tax_id::CNPJ_DIGITS,
            number_marker: names::NUMBER_MARKER.to_string(),
            min_shared_tokens: MIN_SHARED_TOKENS,
            min_token_chars: names::MIN_TOKEN_CHARS,
        }
    }
}
