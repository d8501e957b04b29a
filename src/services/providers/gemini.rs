/// Google Gemini provider
///
/// Calls the REST `generateContent` endpoint directly:
/// POST {api_url}/v1beta/models/{model}:generateContent
/// with the key in the `x-goog-api-key` header.
use crate::{
    error::{AppError, AppResult},
    models::{GenerateContentRequest, GenerateContentResponse},
    services::providers::GenerationProvider,
};
use reqwest::Client as HttpClient;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Clone)]
pub struct GeminiProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, api_url: String, model: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_url.trim_end_matches('/'),
            self.model
        )
    }

    /// Pulls the reply text out of a decoded response
    fn extract_text(&self, response: GenerateContentResponse) -> AppResult<String> {
        if let Some(text) = response.text() {
            return Ok(text);
        }

        let reason = response
            .block_reason()
            .map(|r| format!("prompt blocked: {}", r))
            .or_else(|| {
                response
                    .candidates
                    .first()
                    .and_then(|c| c.finish_reason.clone())
                    .map(|r| format!("no text, finish reason {}", r))
            })
            .unwrap_or_else(|| "no candidates returned".to_string());

        Err(AppError::Upstream(format!(
            "Gemini model {} returned no text: {}",
            self.model, reason
        )))
    }
}

#[async_trait::async_trait]
impl GenerationProvider for GeminiProvider {
    async fn generate(&self, prompt: &str) -> AppResult<String> {
        let response = self
            .http_client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&GenerateContentRequest::from_prompt(prompt))
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "Gemini API returned status {}: {}",
                status, body
            )));
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to read Gemini response: {}", e)))?;
        tracing::debug!(response = %response_text, "Raw Gemini API response");

        let decoded: GenerateContentResponse =
            serde_json::from_str(&response_text).map_err(|e| {
                tracing::error!(
                    error = %e,
                    response = %response_text,
                    "Failed to deserialize Gemini response"
                );
                AppError::Upstream(format!("Failed to parse Gemini response: {}", e))
            })?;

        let text = self.extract_text(decoded)?;

        tracing::info!(
            model = %self.model,
            chars = text.len(),
            provider = "gemini",
            "Generation completed"
        );

        Ok(text)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}
