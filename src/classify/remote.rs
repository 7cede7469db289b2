use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, warn};

use super::types::{ClassificationRequest, ClassificationResponse};
use super::{Classifier, ClassifyError};
use crate::config::ClassifierConfig;
use crate::ingest::DocumentFile;

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Classifier backed by an OpenAI-compatible chat completions endpoint
pub struct RemoteClassifier {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl RemoteClassifier {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClassifyError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClassifyError::NotConfigured(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    /// Read the API key from the configured environment variable
    pub fn from_config(config: &ClassifierConfig) -> Result<Self, ClassifyError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            ClassifyError::NotConfigured(format!("environment variable {} is not set", config.api_key_env))
        })?;

        Self::new(
            config.endpoint.clone(),
            config.model.clone(),
            api_key,
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn build_body(&self, request: &ClassificationRequest) -> Result<Value, ClassifyError> {
        let payload = serde_json::to_string(request)
            .map_err(|e| ClassifyError::Malformed(format!("cannot encode request: {}", e)))?;

        let mut content = vec![json!({ "type": "text", "text": payload })];
        if let Some(document) = &request.document {
            content.push(document_part(document));
        }

        Ok(json!({
            "model": self.model,
            "temperature": 0,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": request.instructions },
                { "role": "user", "content": content },
            ],
        }))
    }
}

/// Attach a document as a base64 data URL
fn document_part(document: &DocumentFile) -> Value {
    let data_url = format!(
        "data:{};base64,{}",
        document.media_type,
        BASE64.encode(&document.bytes)
    );

    if document.media_type.starts_with("image/") {
        json!({ "type": "image_url", "image_url": { "url": data_url } })
    } else {
        json!({
            "type": "file",
            "file": { "filename": document.file_name, "file_data": data_url },
        })
    }
}

/// Coerce non-string mapped values (numbers, booleans) to strings and drop nulls
fn stringify_mapped_values(response: &mut Value) {
    let Some(items) = response.get_mut("items").and_then(Value::as_array_mut) else {
        return;
    };

    for item in items {
        let Some(mapped) = item.get_mut("mappedData").and_then(Value::as_object_mut) else {
            continue;
        };
        mapped.retain(|_, v| !v.is_null());
        for value in mapped.values_mut() {
            if !value.is_string() {
                *value = Value::String(value.to_string());
            }
        }
    }
}

/// Parse the assistant message into a classification response
pub(crate) fn parse_content(content: &str) -> Result<ClassificationResponse, ClassifyError> {
    let trimmed = content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let mut value: Value = serde_json::from_str(trimmed)
        .map_err(|e| ClassifyError::Malformed(format!("response is not JSON: {}", e)))?;
    stringify_mapped_values(&mut value);

    serde_json::from_value(value)
        .map_err(|e| ClassifyError::Malformed(format!("unexpected response shape: {}", e)))
}

#[async_trait]
impl Classifier for RemoteClassifier {
    fn name(&self) -> &str {
        "remote"
    }

    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<ClassificationResponse, ClassifyError> {
        let body = self.build_body(request)?;

        info!(
            endpoint = %self.endpoint,
            model = %self.model,
            rows = request.sampled_rows.len(),
            document = request.document.is_some(),
            "Calling classification service"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClassifyError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(%status, "Classification service returned an error");
            return Err(ClassifyError::Unavailable(format!("HTTP {}: {}", status, text)));
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| ClassifyError::Malformed(e.to_string()))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ClassifyError::Malformed("response has no message content".to_string()))?;

        parse_content(&content)
    }
}
