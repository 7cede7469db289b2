use handlebars::Handlebars;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

use super::types::PromptContext;
use crate::item::SubjectType;
use crate::utils::get_importer_path;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Template error: {0}")]
    TemplateError(#[from] handlebars::TemplateError),

    #[error("Render error: {0}")]
    RenderError(#[from] handlebars::RenderError),
}

const INSTRUCTIONS_TEMPLATE_NAME: &str = "instructions";

/// Built-in classifier instructions
const INSTRUCTIONS_TEMPLATE: &str = r#"You classify rows being imported as {{subject}}.

Map every source column to at most one canonical field below, then check each sampled row.

Canonical fields:
{{#each fields}}
- {{name}} ({{kind}}{{#if required}}, required{{/if}}): {{description}}. Common headers: {{synonyms}}
{{/each}}

Rules:
- A required field that is missing or blank is an issue with severity "error".
- Tax ids (cpf_cnpj, customer_cpf_cnpj): keep digits only. {{cpf_digits}} digits means person_type "fisica", {{cnpj_digits}} digits means "juridica". Any other digit count is an "error" with canAutoFix false. A correct id written with punctuation is a "warning" with canAutoFix true and the digits as suggestedValue.
- Units of measure must use the canonical spelling. Known synonyms are "warning" issues with canAutoFix true:
{{#each units}}
  - {{canonical}}: {{synonyms}}
{{/each}}
  Unknown units are "warning" issues with canAutoFix false.
- Reading numbers: an optional "R$" prefix is ignored. When both "." and "," appear, the last one is the decimal separator ("1.234,56" and "1,234.56" are both 1234.56). A single "," is decimal ("12,5" is 12.5) and so is a single "." ("99.90"). The same separator repeated is grouping ("1.000.000").
- Money values are plain decimals with a dot ("1234.50"). Values like "R$ 1.234,50" are "warning" issues with canAutoFix true and the plain decimal as suggestedValue. Unparseable or negative amounts are "error".
- Quantities must be positive numbers; zero, negative or unparseable quantities are "error". Quantities not written as a plain number ("2,5", "1.500,75") are "warning" issues with canAutoFix true and the plain number ("2.5", "1500.75") as suggestedValue.
- A sale discount larger than quantity times unit_price is an "error" on the discount field.
- Dates use YYYY-MM-DD; day-first dates are "warning" issues with canAutoFix true. Unrecognized dates are "error".
- States use the two-letter abbreviation. Full names are "warning" issues with canAutoFix true:
{{#each states}}
  - {{canonical}}: {{synonyms}}
{{/each}}
- Product names write size markers as "{{number_marker}}" immediately followed by the digit ("N.1", "No 1", "Nr. 1" become "{{number_marker}}1"); differences are "warning" issues with canAutoFix true. A marker needs a dot, "º" or a space before the digit, so codes such as "N95" stay as written.
- Product references must match a product from the references catalog. Compare uppercase, without accents, with whitespace collapsed and the same number markers. Try an exact match, then containment either way (prefer the longest catalog name), then shared words of {{min_token_chars}} or more letters: at least {{min_shared_tokens}} shared words, or every such word of the input when it has fewer. If nothing matches, report an "error" issue "reference not found". Never accept a weaker match. On a match set matchedReferenceName to the catalog name and mappedData product_code to its code.
- Customer references are resolved by tax id digits, then by an exact name match after the same normalization (no containment or word matching). Customer references that match no known customer set needsEntityCreation true.
- A customers row whose tax id already belongs to a customer in the references keeps its status and sets matchedReferenceName to that customer's name. A products row whose code already exists does the same with the product name.

Answer with one JSON object and nothing else:
{"columnMapping": [{"sourceColumn": "...", "canonicalField": "...", "confidence": 0.0}],
 "items": [{"row": 1, "originalData": {"row": 1, "values": {}}, "mappedData": {}, "issues": [{"field": "...", "problem": "...", "currentValue": "...", "suggestedValue": null, "severity": "warning", "canAutoFix": false}], "needsEntityCreation": false, "matchedReferenceName": null}]}
Classify every sampled row exactly once, using its "row" number. When a document is attached instead of rows, extract its rows first and number them from 1, filling "originalData".
"#;

/// Renders classifier instructions from the shared rules tables
pub struct PromptEngine {
    handlebars: Handlebars<'static>,
}

impl PromptEngine {
    pub fn new() -> Result<Self, TemplateError> {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.register_template_string(INSTRUCTIONS_TEMPLATE_NAME, INSTRUCTIONS_TEMPLATE)?;
        Ok(Self { handlebars })
    }

    /// Get the templates directory path
    pub fn get_templates_path(workspace_path: &Path) -> PathBuf {
        get_importer_path(workspace_path).join("templates")
    }

    /// Render the built-in instructions for a subject
    pub fn render_instructions(&self, subject: SubjectType) -> Result<String, TemplateError> {
        let context = PromptContext::for_subject(subject);
        self.handlebars
            .render(INSTRUCTIONS_TEMPLATE_NAME, &context)
            .map_err(TemplateError::from)
    }

    /// Render instructions, preferring "{subject}.hbs" from the workspace templates folder
    pub async fn render_for_workspace(
        &self,
        workspace_path: &Path,
        subject: SubjectType,
    ) -> Result<String, TemplateError> {
        let template_path =
            Self::get_templates_path(workspace_path).join(format!("{}.hbs", subject.as_str()));

        if !template_path.exists() {
            return self.render_instructions(subject);
        }

        let template_content = fs::read_to_string(&template_path).await?;
        let context = PromptContext::for_subject(subject);
        self.handlebars
            .render_template(&template_content, &context)
            .map_err(TemplateError::from)
    }
}
