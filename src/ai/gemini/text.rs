use super::client::{normalize_model, GeminiHttpClient};
use super::types::{Content, GenerateContentResponse, Part};
use crate::ai::TextService;
use crate::models::{ContentPart, GenerationSettings};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct TextRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: TextGenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TextGenerationConfig {
    temperature: f32,
    top_k: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

impl From<&GenerationSettings> for TextGenerationConfig {
    fn from(settings: &GenerationSettings) -> Self {
        Self {
            temperature: settings.temperature,
            top_k: settings.top_k,
            max_output_tokens: settings.max_output_tokens,
        }
    }
}

pub struct GeminiTextClient {
    http: GeminiHttpClient,
    model: String,
}

impl GeminiTextClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_client(api_key, model, reqwest::Client::new())
    }

    pub fn new_with_client(api_key: String, model: String, client: reqwest::Client) -> Self {
        Self {
            http: GeminiHttpClient::new_with_client(api_key, Duration::from_secs(30), client),
            model: normalize_model(&model),
        }
    }

    /// Concatenated text parts of the first candidate, if any.
    fn extract_text(response: &GenerateContentResponse) -> Option<String> {
        let content = response.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();

        (!text.is_empty()).then_some(text)
    }

    fn missing_text_error(response: &GenerateContentResponse) -> Error {
        let reason = response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.clone())
            .or_else(|| {
                response
                    .candidates
                    .first()
                    .and_then(|c| c.finish_reason.clone())
            });

        match reason {
            Some(reason) => Error::AiProvider(format!(
                "No text in Gemini response (reason: {})",
                reason
            )),
            None => Error::AiProvider("No text in Gemini response".to_string()),
        }
    }
}

#[cfg(test)]
super::impl_with_gemini_base_url!(GeminiTextClient);

#[async_trait]
impl TextService for GeminiTextClient {
    async fn generate_text(
        &self,
        parts: &[ContentPart],
        settings: &GenerationSettings,
    ) -> Result<String> {
        let parts: Vec<Part> = parts
            .iter()
            .filter(|p| !p.is_empty_text())
            .map(Part::from)
            .collect();

        if parts.is_empty() {
            return Err(Error::InvalidInput(
                "Text generation needs at least one non-empty part".to_string(),
            ));
        }

        tracing::debug!(
            "Sending {} part(s) to {} (temperature {}, top_k {})",
            parts.len(),
            self.model,
            settings.temperature,
            settings.top_k
        );

        let request = TextRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config: settings.into(),
        };

        let response: GenerateContentResponse =
            self.http.generate_content(&self.model, &request).await?;

        Self::extract_text(&response).ok_or_else(|| Self::missing_text_error(&response))
    }
}
