//! Data models and structures
//!
//! Defines the records passed between the studio and the generative service:
//! sampling settings, uploaded file handles, content parts and images, plus
//! the environment-driven configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "imagen-3.0-generate-002";
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Sampling options for text generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub top_k: u32,
    pub max_output_tokens: Option<u32>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 1.2,
            top_k: 100,
            max_output_tokens: None,
        }
    }
}

impl GenerationSettings {
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }
}

/// Options for image generation requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSettings {
    pub number_of_images: u32,
    pub include_rai_reason: bool,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            number_of_images: 1,
            include_rai_reason: true,
        }
    }
}

/// A file stored by the Files API, referenced from later generation requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileHandle {
    /// Resource name, e.g. `files/abc123`.
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub size_bytes: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// One piece of request content.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    File { uri: String, mime_type: String },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text(text.into())
    }

    pub fn file(handle: &FileHandle) -> Self {
        ContentPart::File {
            uri: handle.uri.clone(),
            mime_type: handle.mime_type.clone(),
        }
    }

    pub fn is_empty_text(&self) -> bool {
        matches!(self, ContentPart::Text(text) if text.trim().is_empty())
    }
}

/// Raw image bytes as returned by the image model.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub text_model: String,
    pub image_model: String,
    pub output_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> crate::Result<Self> {
        load_env_file(dotenvy::dotenv())?;

        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| crate::Error::Config("GEMINI_API_KEY not set".to_string()))?;

        Ok(Self {
            api_key,
            text_model: std::env::var("WEIRDGEN_TEXT_MODEL")
                .unwrap_or_else(|_| DEFAULT_TEXT_MODEL.to_string()),
            image_model: std::env::var("WEIRDGEN_IMAGE_MODEL")
                .unwrap_or_else(|_| DEFAULT_IMAGE_MODEL.to_string()),
            output_dir: std::env::var("WEIRDGEN_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        })
    }
}

/// A missing `.env` is fine; a present but malformed one is an error.
fn load_env_file(loaded: std::result::Result<PathBuf, dotenvy::Error>) -> crate::Result<()> {
    match loaded {
        Ok(path) => {
            tracing::debug!("Loaded environment from {}", path.display());
            Ok(())
        }
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(e.into()),
    }
}
