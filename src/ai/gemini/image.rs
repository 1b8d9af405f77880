use super::client::{normalize_model, GeminiHttpClient};
use crate::ai::ImageGenerationService;
use crate::models::{GeneratedImage, ImageSettings};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct PredictRequest {
    instances: Vec<PredictInstance>,
    parameters: PredictParameters,
}

#[derive(Debug, Serialize)]
struct PredictInstance {
    prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    sample_count: u32,
    include_rai_reason: bool,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

/// One Imagen prediction: either an image or the reason it was filtered.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    #[serde(default)]
    bytes_base64_encoded: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    rai_filtered_reason: Option<String>,
}

pub struct GeminiImageClient {
    http: GeminiHttpClient,
    model: String,
}

impl GeminiImageClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_client(api_key, model, reqwest::Client::new())
    }

    pub fn new_with_client(api_key: String, model: String, client: reqwest::Client) -> Self {
        Self {
            http: GeminiHttpClient::new_with_client(api_key, Duration::from_secs(120), client),
            model: normalize_model(&model),
        }
    }
}

#[cfg(test)]
super::impl_with_gemini_base_url!(GeminiImageClient);

#[async_trait]
impl ImageGenerationService for GeminiImageClient {
    async fn generate_images(
        &self,
        prompt: &str,
        settings: &ImageSettings,
    ) -> Result<Vec<GeneratedImage>> {
        let request = PredictRequest {
            instances: vec![PredictInstance {
                prompt: prompt.to_string(),
            }],
            parameters: PredictParameters {
                sample_count: settings.number_of_images,
                include_rai_reason: settings.include_rai_reason,
            },
        };

        let response: PredictResponse = self.http.predict(&self.model, &request).await?;

        use base64::Engine as _;
        let mut images = Vec::new();
        let mut filtered = Vec::new();

        for prediction in response.predictions {
            match prediction.bytes_base64_encoded {
                Some(data) => {
                    let bytes = base64::engine::general_purpose::STANDARD
                        .decode(&data)
                        .map_err(|e| {
                            Error::AiProvider(format!("Failed to decode Imagen base64 image: {}", e))
                        })?;
                    let mime_type = prediction
                        .mime_type
                        .unwrap_or_else(|| crate::ai::mime::detect_image_mime(&bytes).to_string());
                    tracing::debug!("Imagen returned {} bytes of {}", bytes.len(), mime_type);
                    images.push(GeneratedImage { bytes, mime_type });
                }
                None => {
                    if let Some(reason) = prediction.rai_filtered_reason {
                        tracing::warn!("Imagen filtered an image: {}", reason);
                        filtered.push(reason);
                    }
                }
            }
        }

        if images.is_empty() {
            return Err(if filtered.is_empty() {
                Error::AiProvider("No image data in Imagen response".to_string())
            } else {
                Error::AiProvider(format!(
                    "All images were filtered: {}",
                    filtered.join("; ")
                ))
            });
        }

        Ok(images)
    }
}
