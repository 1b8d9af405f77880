use super::client::GeminiHttpClient;
use crate::ai::{mime, FileService};
use crate::models::FileHandle;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const LIST_PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: FileHandle,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListFilesResponse {
    #[serde(default)]
    files: Vec<FileHandle>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Files API client: resumable single-shot uploads and paginated listing.
pub struct GeminiFilesClient {
    http: GeminiHttpClient,
}

impl GeminiFilesClient {
    pub fn new(api_key: String) -> Self {
        Self::new_with_client(api_key, reqwest::Client::new())
    }

    pub fn new_with_client(api_key: String, client: reqwest::Client) -> Self {
        Self {
            http: GeminiHttpClient::new_with_client(api_key, Duration::from_secs(120), client),
        }
    }

    async fn start_resumable_upload(
        &self,
        display_name: &str,
        size_bytes: usize,
        mime_type: &str,
    ) -> Result<String> {
        let url = format!("{}/upload/v1beta/files", self.http.base_url);
        let body = serde_json::json!({ "file": { "displayName": display_name } });

        let request = self
            .http
            .client
            .post(&url)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header(
                "X-Goog-Upload-Header-Content-Length",
                size_bytes.to_string(),
            )
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&body);

        let response = self.http.send(request).await?;

        response
            .headers()
            .get("x-goog-upload-url")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| Error::AiProvider("Missing x-goog-upload-url header".to_string()))
    }

    async fn finalize_upload(&self, upload_url: &str, data: Vec<u8>) -> Result<FileHandle> {
        let request = self
            .http
            .client
            .post(upload_url)
            .header("X-Goog-Upload-Command", "upload, finalize")
            .header("X-Goog-Upload-Offset", "0")
            .body(data);

        let response = self.http.send(request).await?;

        let status = response
            .headers()
            .get("x-goog-upload-status")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        if let Some(status) = status.filter(|s| s != "final") {
            return Err(Error::AiProvider(format!(
                "Upload finalize failed: {}",
                status
            )));
        }

        let uploaded: UploadResponse = GeminiHttpClient::parse(response).await?;
        Ok(uploaded.file)
    }
}

#[cfg(test)]
super::impl_with_gemini_base_url!(GeminiFilesClient);

#[async_trait]
impl FileService for GeminiFilesClient {
    async fn upload(&self, path: &Path, display_name: &str) -> Result<FileHandle> {
        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::MissingInput(format!(
                    "File does not exist: {}",
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let mime_type = mime::detect_image_mime(&data);
        tracing::info!(
            "Uploading {} ({} bytes, {}) as '{}'",
            path.display(),
            data.len(),
            mime_type,
            display_name
        );

        let upload_url = self
            .start_resumable_upload(display_name, data.len(), mime_type)
            .await?;
        let file = self.finalize_upload(&upload_url, data).await?;

        tracing::info!("Uploaded {} -> {}", display_name, file.name);
        Ok(file)
    }

    async fn list(&self) -> Result<Vec<FileHandle>> {
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("pageSize", LIST_PAGE_SIZE.to_string())];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }

            let page: ListFilesResponse = self.http.get_json("/v1beta/files", &query).await?;
            files.extend(page.files);

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::debug!("Listed {} stored file(s)", files.len());
        Ok(files)
    }
}
