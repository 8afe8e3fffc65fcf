use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use tidy_core::gateway::{AnalysisContext, VisionAnalyzer};
use tidy_core::{AnalysisResult, ServiceError};

use crate::{check_status, transport_error};

const SCORING_PROMPT: &str = "\
Analyze the provided image of a room and perform the following tasks:
1. Rate the overall cleanliness of the room on a scale of 1 to 100, where 1 is extremely messy and 100 is perfectly clean.
2. Identify specific, actionable tasks that would improve the room's cleanliness. The tasks should be clear and concise.

Return the output ONLY in a valid JSON format with two keys:
- \"score\": An integer representing the cleanliness score.
- \"tasks\": A list of strings, where each string is a cleaning task.";

/// Prompt text for one zone: scoring instructions plus what the zone is for
/// and which tasks are already open (so the model does not repeat them).
pub fn build_prompt(context: &AnalysisContext) -> String {
    let mut prompt = String::from(SCORING_PROMPT);
    prompt.push_str(&format!("\n\nThe area is \"{}\".", context.zone));
    if !context.purpose.trim().is_empty() {
        prompt.push_str(&format!(" Its purpose: {}.", context.purpose.trim()));
    }
    if !context.open_tasks.is_empty() {
        prompt.push_str("\nThese tasks are already on the list; do not repeat them:");
        for task in &context.open_tasks {
            prompt.push_str(&format!("\n- {task}"));
        }
    }
    prompt
}

/// Extract `candidates[0].content.parts[*].text` from a generateContent reply.
fn response_text(body: &Value) -> Result<String, ServiceError> {
    let parts = body
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .ok_or_else(|| ServiceError::Malformed("no candidates in response".into()))?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    if text.trim().is_empty() {
        return Err(ServiceError::Malformed("empty model reply".into()));
    }
    Ok(text)
}

/// Gemini `generateContent` client.
pub struct GeminiAnalyzer {
    client: Client,
    endpoint: String,
    model: String,
    api_key: SecretString,
    timeout: Duration,
}

impl GeminiAnalyzer {
    pub fn new(
        endpoint: &str,
        model: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Unreachable(format!("http client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: SecretString::from(api_key.into()),
            timeout,
        })
    }

    fn request_body(image: &[u8], context: &AnalysisContext) -> Value {
        let data = base64::engine::general_purpose::STANDARD.encode(image);
        json!({
            "contents": [{
                "parts": [
                    { "text": build_prompt(context) },
                    { "inline_data": { "mime_type": "image/jpeg", "data": data } }
                ]
            }],
            "generationConfig": { "responseMimeType": "application/json" }
        })
    }
}

#[async_trait]
impl VisionAnalyzer for GeminiAnalyzer {
    fn name(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, image, context), fields(zone = %context.zone, model = %self.model))]
    async fn analyze(
        &self,
        image: &[u8],
        context: &AnalysisContext,
    ) -> Result<AnalysisResult, ServiceError> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        let resp = self
            .client
            .post(url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&Self::request_body(image, context))
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        let body: Value = check_status(resp)
            .await?
            .json()
            .await
            .map_err(|e| ServiceError::Malformed(e.to_string()))?;

        let text = response_text(&body)?;
        let result = AnalysisResult::parse(&text)?;
        debug!(score = result.score(), tasks = result.tasks().len(), "analysis parsed");
        Ok(result)
    }
}
