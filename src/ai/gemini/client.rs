use crate::{Error, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Lightweight Gemini REST client shared by the text, image and files modules.
pub struct GeminiHttpClient {
    pub(crate) client: Client,
    pub(crate) api_key: String,
    pub(crate) base_url: String,
    timeout: Duration,
}

/// Strip a leading `models/` so callers may pass either form of a model ID.
pub fn normalize_model(model: &str) -> String {
    model.strip_prefix("models/").unwrap_or(model).to_string()
}

impl GeminiHttpClient {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        Self::new_with_client(api_key, timeout, Client::new())
    }

    pub fn new_with_client(api_key: String, timeout: Duration, client: Client) -> Self {
        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout,
        }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Attach auth and timeout, send, and turn non-2xx responses into errors.
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .timeout(self.timeout)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to Gemini: {}", e);
                e
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            tracing::error!("Gemini API error (status {}): {}", status, error_text);
            return Err(Error::AiProvider(format!(
                "Gemini API error (status {}): {}",
                status, error_text
            )));
        }

        Ok(response)
    }

    pub(crate) async fn parse<Resp: DeserializeOwned>(response: Response) -> Result<Resp> {
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse Gemini response: {}\nBody: {}", e, body);
            Error::Serialization(e)
        })
    }

    async fn post_to_url<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        url: String,
        request: &Req,
    ) -> Result<Resp> {
        let response = self.send(self.client.post(&url).json(request)).await?;
        Self::parse(response).await
    }

    /// Calls Gemini's `generateContent` endpoint for text requests.
    pub async fn generate_content<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        model: &str,
        request: &Req,
    ) -> Result<Resp> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, model
        );
        self.post_to_url(url, request).await
    }

    /// Calls the `predict` endpoint used by Imagen models.
    pub async fn predict<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        model: &str,
        request: &Req,
    ) -> Result<Resp> {
        let url = format!("{}/v1beta/models/{}:predict", self.base_url, model);
        self.post_to_url(url, request).await
    }

    /// GET a JSON resource relative to the API base, e.g. `/v1beta/files`.
    pub async fn get_json<Resp: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Resp> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.send(self.client.get(&url).query(query)).await?;
        Self::parse(response).await
    }
}
