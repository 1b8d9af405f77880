use super::{FileService, ImageGenerationService, TextService};
use crate::models::{ContentPart, FileHandle, GeneratedImage, GenerationSettings, ImageSettings};
use crate::{Error, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// A 1x1 PNG returned when no image response is configured.
pub const TINY_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, // PNG signature
    0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, // IHDR chunk
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, // 1x1 pixel
    0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53, 0xDE, 0x00, 0x00, 0x00, 0x0C, 0x49, 0x44,
    0x41, // IDAT chunk
    0x54, 0x08, 0x99, 0x63, 0xF8, 0xCF, 0xC0, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0xE2, 0x25,
    0x00, 0xBC, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, // IEND chunk
    0x44, 0xAE, 0x42, 0x60, 0x82,
];

/// One recorded `generate_text` call.
#[derive(Debug, Clone, PartialEq)]
pub struct TextCall {
    pub parts: Vec<ContentPart>,
    pub settings: GenerationSettings,
}

#[derive(Clone, Default)]
pub struct MockTextClient {
    responses: Arc<Mutex<Vec<String>>>,
    calls: Arc<Mutex<Vec<TextCall>>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockTextClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text_response(self, response: String) -> Self {
        self.responses.lock().unwrap().push(response);
        self
    }

    pub fn with_failure(self, should_fail: bool) -> Self {
        *self.should_fail.lock().unwrap() = should_fail;
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<TextCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_call(&self) -> Option<TextCall> {
        self.calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TextService for MockTextClient {
    async fn generate_text(
        &self,
        parts: &[ContentPart],
        settings: &GenerationSettings,
    ) -> Result<String> {
        let count = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(TextCall {
                parts: parts.to_vec(),
                settings: *settings,
            });
            calls.len()
        };

        if *self.should_fail.lock().unwrap() {
            return Err(Error::AiProvider("Mock text failure".to_string()));
        }

        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            // Echo the text parts back so callers can see what was sent.
            let echoed: Vec<&str> = parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text(text) => Some(text.as_str()),
                    ContentPart::File { .. } => None,
                })
                .collect();
            Ok(format!("Generated: {}", echoed.join(" | ")))
        } else {
            let index = (count - 1) % responses.len();
            Ok(responses[index].clone())
        }
    }
}

#[derive(Clone, Default)]
pub struct MockImageGenerationClient {
    image_responses: Arc<Mutex<Vec<GeneratedImage>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    filter_all: Arc<Mutex<bool>>,
}

impl MockImageGenerationClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image_response(self, bytes: Vec<u8>, mime_type: &str) -> Self {
        self.image_responses.lock().unwrap().push(GeneratedImage {
            bytes,
            mime_type: mime_type.to_string(),
        });
        self
    }

    /// Behave as if every image was removed by the safety filter.
    pub fn with_everything_filtered(self) -> Self {
        *self.filter_all.lock().unwrap() = true;
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageGenerationService for MockImageGenerationClient {
    async fn generate_images(
        &self,
        prompt: &str,
        settings: &ImageSettings,
    ) -> Result<Vec<GeneratedImage>> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        if *self.filter_all.lock().unwrap() {
            return Err(Error::AiProvider(
                "All images were filtered: mock filter".to_string(),
            ));
        }

        let responses = self.image_responses.lock().unwrap();
        let count = settings.number_of_images.max(1) as usize;
        if responses.is_empty() {
            Ok(vec![
                GeneratedImage {
                    bytes: TINY_PNG.to_vec(),
                    mime_type: "image/png".to_string(),
                };
                count
            ])
        } else {
            Ok(responses.iter().take(count).cloned().collect())
        }
    }
}

#[derive(Clone, Default)]
pub struct MockFileClient {
    files: Arc<Mutex<Vec<FileHandle>>>,
    list_calls: Arc<Mutex<usize>>,
}

impl MockFileClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, display_name: &str) -> Self {
        let handle = Self::handle_for(self.files.lock().unwrap().len(), display_name, "image/png");
        self.files.lock().unwrap().push(handle);
        self
    }

    pub fn get_list_count(&self) -> usize {
        *self.list_calls.lock().unwrap()
    }

    fn handle_for(index: usize, display_name: &str, mime_type: &str) -> FileHandle {
        let name = format!("files/mock-{}", index);
        FileHandle {
            uri: format!("https://mock.files/{}", name),
            name,
            display_name: Some(display_name.to_string()),
            mime_type: mime_type.to_string(),
            size_bytes: None,
            state: Some("ACTIVE".to_string()),
        }
    }
}

#[async_trait]
impl FileService for MockFileClient {
    async fn upload(&self, path: &Path, display_name: &str) -> Result<FileHandle> {
        if !path.is_file() {
            return Err(Error::MissingInput(format!(
                "File does not exist: {}",
                path.display()
            )));
        }

        let bytes = std::fs::read(path)?;
        let mime_type = super::mime::detect_image_mime(&bytes);

        let mut files = self.files.lock().unwrap();
        let handle = Self::handle_for(files.len(), display_name, mime_type);
        files.push(handle.clone());
        Ok(handle)
    }

    async fn list(&self) -> Result<Vec<FileHandle>> {
        *self.list_calls.lock().unwrap() += 1;
        Ok(self.files.lock().unwrap().clone())
    }
}
