//! Generative service integration
//!
//! The studio talks to three collaborator seams: text generation, image
//! generation and file storage. Gemini implements all three over REST; the
//! mocks stand in for them in tests.

pub mod gemini;
pub mod mime;
pub mod mock;

pub use gemini::{GeminiFilesClient, GeminiImageClient, GeminiTextClient};
pub use mock::{MockFileClient, MockImageGenerationClient, MockTextClient};

use crate::models::{ContentPart, FileHandle, GenerationSettings, GeneratedImage, ImageSettings};
use crate::Result;
use async_trait::async_trait;
use std::path::Path;

#[async_trait]
pub trait TextService: Send + Sync {
    /// Send `parts` as one user turn and return the generated text.
    async fn generate_text(
        &self,
        parts: &[ContentPart],
        settings: &GenerationSettings,
    ) -> Result<String>;
}

#[async_trait]
pub trait ImageGenerationService: Send + Sync {
    /// Render `prompt`; the result holds at least one image on success.
    async fn generate_images(
        &self,
        prompt: &str,
        settings: &ImageSettings,
    ) -> Result<Vec<GeneratedImage>>;
}

#[async_trait]
pub trait FileService: Send + Sync {
    async fn upload(&self, path: &Path, display_name: &str) -> Result<FileHandle>;
    async fn list(&self) -> Result<Vec<FileHandle>>;
}
