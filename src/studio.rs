//! Prompt and image operations over the injected generative services.

use crate::ai::{
    mime, FileService, GeminiFilesClient, GeminiImageClient, GeminiTextClient,
    ImageGenerationService, TextService,
};
use crate::models::{
    Config, ContentPart, FileHandle, GeneratedImage, GenerationSettings, ImageSettings,
};
use crate::{naming, prompts, Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Token cap applied to `imagine`, which should produce a short description.
pub const IMAGINE_MAX_OUTPUT_TOKENS: u32 = 256;

/// Holds the generative services, the output directory and default sampling options.
pub struct Studio {
    text: Box<dyn TextService>,
    images: Box<dyn ImageGenerationService>,
    files: Box<dyn FileService>,
    output_dir: PathBuf,
    settings: GenerationSettings,
    image_settings: ImageSettings,
}

/// Injectable service bundle used to construct [`Studio`] in tests/harnesses.
pub struct StudioServices {
    pub text: Box<dyn TextService>,
    pub images: Box<dyn ImageGenerationService>,
    pub files: Box<dyn FileService>,
}

impl Studio {
    /// Build a studio from concrete service dependencies.
    pub fn with_services(services: StudioServices, output_dir: PathBuf) -> Self {
        Self {
            text: services.text,
            images: services.images,
            files: services.files,
            output_dir,
            settings: GenerationSettings::default(),
            image_settings: ImageSettings::default(),
        }
    }

    /// Build Gemini-backed services from configuration.
    pub fn from_config(config: &Config) -> Self {
        // Reuse one HTTP connection pool across the service clients.
        let http_client = reqwest::Client::new();

        info!(
            "Text model: {}, image model: {}",
            config.text_model, config.image_model
        );

        Self::with_services(
            StudioServices {
                text: Box::new(GeminiTextClient::new_with_client(
                    config.api_key.clone(),
                    config.text_model.clone(),
                    http_client.clone(),
                )),
                images: Box::new(GeminiImageClient::new_with_client(
                    config.api_key.clone(),
                    config.image_model.clone(),
                    http_client.clone(),
                )),
                files: Box::new(GeminiFilesClient::new_with_client(
                    config.api_key.clone(),
                    http_client,
                )),
            },
            config.output_dir.clone(),
        )
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_image_settings(mut self, image_settings: ImageSettings) -> Self {
        self.image_settings = image_settings;
        self
    }

    /// Default sampling options handed to new fluent records.
    pub fn settings(&self) -> GenerationSettings {
        self.settings
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Upload a local file, using its basename as the display name.
    pub async fn upload(&self, path: &Path) -> Result<FileHandle> {
        if !path.is_file() {
            return Err(Error::MissingInput(format!(
                "File does not exist: {}",
                path.display()
            )));
        }

        let display_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| Error::MissingInput(format!("No file name in {}", path.display())))?;

        self.files.upload(path, &display_name).await
    }

    pub async fn list_files(&self) -> Result<Vec<FileHandle>> {
        self.files.list().await
    }

    /// First stored file whose display name equals `display_name`.
    pub async fn get_file(&self, display_name: &str) -> Result<Option<FileHandle>> {
        Ok(self
            .list_files()
            .await?
            .into_iter()
            .find(|f| f.display_name.as_deref() == Some(display_name)))
    }

    /// Describe an uploaded image well enough for an image model to recreate it.
    ///
    /// Non-empty `instructions` are sent as a lens the description must follow.
    pub async fn describe(
        &self,
        file: &FileHandle,
        instructions: &str,
        settings: &GenerationSettings,
    ) -> Result<String> {
        let mut parts = vec![
            ContentPart::file(file),
            ContentPart::text(prompts::render(prompts::DESCRIBE, &[])),
        ];
        if !instructions.trim().is_empty() {
            parts.push(ContentPart::text(prompts::render(
                prompts::LENS,
                &[("lens", instructions)],
            )));
        }

        self.run_text("describe", &parts, settings).await
    }

    /// Describe only the artistic style of an uploaded image.
    pub async fn style(
        &self,
        file: &FileHandle,
        instructions: &str,
        settings: &GenerationSettings,
    ) -> Result<String> {
        let parts = vec![
            ContentPart::file(file),
            ContentPart::text(prompts::render(prompts::STYLE, &[])),
            ContentPart::text(instructions),
        ];

        self.run_text("style", &parts, settings).await
    }

    /// Rework `prompt` in the given style while keeping its subject.
    pub async fn restyle(
        &self,
        prompt: &str,
        style: &str,
        settings: &GenerationSettings,
    ) -> Result<String> {
        let parts = vec![ContentPart::text(prompts::render(
            prompts::RESTYLE,
            &[("input", prompt), ("style", style)],
        ))];

        self.run_text("restyle", &parts, settings).await
    }

    /// Blend two prompts; `strength` is the weight of `a` over `b` in percent.
    pub async fn blend(
        &self,
        a: &str,
        b: &str,
        strength: u8,
        settings: &GenerationSettings,
    ) -> Result<String> {
        if strength > 100 {
            return Err(Error::InvalidInput(format!(
                "Blend strength must be between 0 and 100, got {}",
                strength
            )));
        }

        let strength = strength.to_string();
        let parts = vec![ContentPart::text(prompts::render(
            prompts::BLEND,
            &[("a", a), ("b", b), ("strength", &strength)],
        ))];

        self.run_text("blend", &parts, settings).await
    }

    /// Recontextualize `prompt` through the frame given by `lens`.
    pub async fn mutate(
        &self,
        prompt: &str,
        lens: &str,
        settings: &GenerationSettings,
    ) -> Result<String> {
        let parts = vec![ContentPart::text(prompts::render(
            prompts::MUTATE,
            &[("frame", lens), ("input", prompt)],
        ))];

        self.run_text("mutate", &parts, settings).await
    }

    /// Free-form generation from a subject and an instruction, capped at 256 tokens.
    pub async fn imagine(
        &self,
        subject: &str,
        prompt: &str,
        settings: &GenerationSettings,
    ) -> Result<String> {
        let parts = vec![ContentPart::text(subject), ContentPart::text(prompt)];
        let settings = settings.with_max_output_tokens(IMAGINE_MAX_OUTPUT_TOKENS);

        self.run_text("imagine", &parts, &settings).await
    }

    /// Render `prompt` and return the first image.
    pub async fn generate(&self, prompt: &str) -> Result<GeneratedImage> {
        info!("Generating image ({} chars of prompt)", prompt.len());

        let images = self
            .images
            .generate_images(prompt, &self.image_settings)
            .await?;

        let image = images
            .into_iter()
            .next()
            .ok_or_else(|| Error::AiProvider("Image service returned no images".to_string()))?;

        info!(
            "Generated image ({} bytes, {})",
            image.bytes.len(),
            image.mime_type
        );
        Ok(image)
    }

    /// Write `image` to the output directory as `<prefix><n>.<ext>`.
    pub fn save(&self, image: &GeneratedImage, prefix: &str) -> Result<PathBuf> {
        let extension = mime::extension_for_mime(&image.mime_type);
        let path = naming::write_sequenced(&self.output_dir, prefix, extension, &image.bytes)?;

        info!("Saved image to {}", path.display());
        Ok(path)
    }

    async fn run_text(
        &self,
        operation: &str,
        parts: &[ContentPart],
        settings: &GenerationSettings,
    ) -> Result<String> {
        debug!("[{}] Sending {} part(s)", operation, parts.len());

        let text = self.text.generate_text(parts, settings).await?;

        info!("[{}] Generated {} chars", operation, text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::{Studio, StudioServices, IMAGINE_MAX_OUTPUT_TOKENS};
    use crate::ai::{MockFileClient, MockImageGenerationClient, MockTextClient};
    use crate::models::{ContentPart, GeneratedImage, GenerationSettings};
    use crate::Error;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn build_test_studio(
        output_dir: &Path,
        text: MockTextClient,
        images: MockImageGenerationClient,
        files: MockFileClient,
    ) -> Studio {
        Studio::with_services(
            StudioServices {
                text: Box::new(text),
                images: Box::new(images),
                files: Box::new(files),
            },
            output_dir.to_path_buf(),
        )
    }

    fn text_parts(parts: &[ContentPart]) -> Vec<String> {
        parts
            .iter()
            .filter_map(|p| match p {
                ContentPart::Text(text) => Some(text.clone()),
                ContentPart::File { .. } => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_describe_sends_file_then_instructions_and_lens() {
        let dir = tempdir().unwrap();
        let text = MockTextClient::new().with_text_response("a red door".to_string());
        let probe = text.clone();
        let files = MockFileClient::new().with_file("door.png");
        let studio = build_test_studio(
            dir.path(),
            text,
            MockImageGenerationClient::new(),
            files,
        );

        let file = studio.get_file("door.png").await.unwrap().unwrap();
        let settings = studio.settings();
        let description = studio.describe(&file, "film noir", &settings).await.unwrap();
        assert_eq!(description, "a red door");

        let call = probe.last_call().unwrap();
        assert_eq!(call.parts[0], ContentPart::file(&file));
        assert_eq!(call.parts.len(), 3);
        assert_eq!(
            call.parts[2],
            ContentPart::Text("Lens: film noir".to_string())
        );
        assert_eq!(call.settings, GenerationSettings::default());
    }

    #[tokio::test]
    async fn test_describe_without_lens_omits_lens_part() {
        let dir = tempdir().unwrap();
        let text = MockTextClient::new();
        let probe = text.clone();
        let studio = build_test_studio(
            dir.path(),
            text,
            MockImageGenerationClient::new(),
            MockFileClient::new().with_file("a.png"),
        );

        let file = studio.get_file("a.png").await.unwrap().unwrap();
        studio
            .describe(&file, "", &studio.settings())
            .await
            .unwrap();

        let call = probe.last_call().unwrap();
        assert_eq!(call.parts.len(), 2);
        assert!(text_parts(&call.parts).iter().all(|t| !t.starts_with("Lens:")));
    }

    #[tokio::test]
    async fn test_style_passes_instructions_through() {
        let dir = tempdir().unwrap();
        let text = MockTextClient::new();
        let probe = text.clone();
        let studio = build_test_studio(
            dir.path(),
            text,
            MockImageGenerationClient::new(),
            MockFileClient::new().with_file("a.png"),
        );

        let file = studio.get_file("a.png").await.unwrap().unwrap();
        studio
            .style(&file, "focus on brushwork", &studio.settings())
            .await
            .unwrap();

        let call = probe.last_call().unwrap();
        assert_eq!(
            call.parts.last(),
            Some(&ContentPart::Text("focus on brushwork".to_string()))
        );
    }

    #[tokio::test]
    async fn test_restyle_mutate_blend_render_templates() {
        let dir = tempdir().unwrap();
        let text = MockTextClient::new();
        let probe = text.clone();
        let studio = build_test_studio(
            dir.path(),
            text,
            MockImageGenerationClient::new(),
            MockFileClient::new(),
        );
        let settings = studio.settings();

        studio.restyle("a cat", "ukiyo-e", &settings).await.unwrap();
        studio.mutate("a cat", "as a tax form", &settings).await.unwrap();
        studio.blend("a cat", "a comet", 70, &settings).await.unwrap();

        let calls = probe.calls();
        let restyle = &text_parts(&calls[0].parts)[0];
        assert!(restyle.contains("<input>a cat</input>"));
        assert!(restyle.contains("<style>ukiyo-e</style>"));

        let mutate = &text_parts(&calls[1].parts)[0];
        assert!(mutate.contains("<f>as a tax form</f>"));
        assert!(mutate.contains("<i>a cat</i>"));

        let blend = &text_parts(&calls[2].parts)[0];
        assert!(blend.contains("<a>a cat</a>"));
        assert!(blend.contains("<b>a comet</b>"));
        assert!(blend.contains("<strength>70</strength>"));
    }

    #[tokio::test]
    async fn test_blend_rejects_out_of_range_strength() {
        let dir = tempdir().unwrap();
        let text = MockTextClient::new();
        let probe = text.clone();
        let studio = build_test_studio(
            dir.path(),
            text,
            MockImageGenerationClient::new(),
            MockFileClient::new(),
        );

        let err = studio
            .blend("a", "b", 101, &studio.settings())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(probe.get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_imagine_caps_output_tokens() {
        let dir = tempdir().unwrap();
        let text = MockTextClient::new();
        let probe = text.clone();
        let studio = build_test_studio(
            dir.path(),
            text,
            MockImageGenerationClient::new(),
            MockFileClient::new(),
        );

        studio
            .imagine("a jealous hammer", "describe this scene", &studio.settings())
            .await
            .unwrap();

        let call = probe.last_call().unwrap();
        assert_eq!(
            text_parts(&call.parts),
            vec!["a jealous hammer".to_string(), "describe this scene".to_string()]
        );
        assert_eq!(
            call.settings.max_output_tokens,
            Some(IMAGINE_MAX_OUTPUT_TOKENS)
        );
    }

    #[tokio::test]
    async fn test_upload_missing_path_is_missing_input() {
        let dir = tempdir().unwrap();
        let studio = build_test_studio(
            dir.path(),
            MockTextClient::new(),
            MockImageGenerationClient::new(),
            MockFileClient::new(),
        );

        let err = studio
            .upload(&dir.path().join("missing.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingInput(_)));
    }

    #[tokio::test]
    async fn test_upload_uses_basename_as_display_name() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("inputs").join("portrait.jpg");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, [0xFF, 0xD8, 0xFF, 0xE0]).unwrap();

        let studio = build_test_studio(
            dir.path(),
            MockTextClient::new(),
            MockImageGenerationClient::new(),
            MockFileClient::new(),
        );

        let handle = studio.upload(&source).await.unwrap();
        assert_eq!(handle.display_name.as_deref(), Some("portrait.jpg"));
        assert!(studio.get_file("portrait.jpg").await.unwrap().is_some());
        assert!(studio.get_file("other.jpg").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_generate_and_save_sequence_files() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("output");
        let images = MockImageGenerationClient::new();
        let probe = images.clone();
        let studio = build_test_studio(
            &output_dir,
            MockTextClient::new(),
            images,
            MockFileClient::new(),
        );

        let image = studio.generate("velvet frogs").await.unwrap();
        let first = studio.save(&image, "x").unwrap();
        let second = studio.save(&image, "x").unwrap();

        assert_eq!(first, output_dir.join("x1.png"));
        assert_eq!(second, output_dir.join("x2.png"));
        assert_eq!(fs::read(&first).unwrap(), image.bytes);
        assert_eq!(probe.prompts(), vec!["velvet frogs".to_string()]);
    }

    #[tokio::test]
    async fn test_save_uses_extension_for_mime() {
        let dir = tempdir().unwrap();
        let studio = build_test_studio(
            dir.path(),
            MockTextClient::new(),
            MockImageGenerationClient::new(),
            MockFileClient::new(),
        );

        let image = GeneratedImage {
            bytes: vec![0xFF, 0xD8, 0xFF, 0xE0],
            mime_type: "image/jpeg".to_string(),
        };
        let path = studio.save(&image, "shot").unwrap();
        assert_eq!(path, dir.path().join("shot1.jpg"));
    }

    #[tokio::test]
    async fn test_generate_propagates_filter_error() {
        let dir = tempdir().unwrap();
        let studio = build_test_studio(
            dir.path(),
            MockTextClient::new(),
            MockImageGenerationClient::new().with_everything_filtered(),
            MockFileClient::new(),
        );

        let err = studio.generate("x").await.unwrap_err();
        assert!(matches!(err, Error::AiProvider(_)));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_text_failure_propagates() {
        let dir = tempdir().unwrap();
        let studio = build_test_studio(
            dir.path(),
            MockTextClient::new().with_failure(true),
            MockImageGenerationClient::new(),
            MockFileClient::new(),
        );

        let err = studio
            .restyle("a", "b", &studio.settings())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AiProvider(_)));
    }
}
