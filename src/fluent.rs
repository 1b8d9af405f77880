//! Chainable wrappers over [`Studio`] operations.
//!
//! Each record is immutable; every call returns a new record that carries the
//! same sampling settings forward, so a chain like
//! `file.describe("").await?.restyle("ink wash").await?.generate().await?.save("x")`
//! reads top to bottom.

use crate::models::{FileHandle, GeneratedImage, GenerationSettings};
use crate::studio::Studio;
use crate::Result;
use std::fmt;
use std::path::{Path, PathBuf};

/// An uploaded file bound to a studio.
#[derive(Clone)]
pub struct GenFile<'a> {
    studio: &'a Studio,
    file: FileHandle,
    settings: GenerationSettings,
}

impl<'a> GenFile<'a> {
    pub fn new(studio: &'a Studio, file: FileHandle) -> Self {
        Self {
            studio,
            file,
            settings: studio.settings(),
        }
    }

    pub fn with_settings(&self, settings: GenerationSettings) -> Self {
        Self {
            settings,
            ..self.clone()
        }
    }

    pub fn file(&self) -> &FileHandle {
        &self.file
    }

    pub async fn describe(&self, instructions: &str) -> Result<GenText<'a>> {
        let text = self
            .studio
            .describe(&self.file, instructions, &self.settings)
            .await?;
        Ok(GenText::with_text(self.studio, text, self.settings))
    }

    pub async fn style(&self, instructions: &str) -> Result<GenText<'a>> {
        let text = self
            .studio
            .style(&self.file, instructions, &self.settings)
            .await?;
        Ok(GenText::with_text(self.studio, text, self.settings))
    }
}

/// A piece of generated (or seed) prompt text.
#[derive(Clone)]
pub struct GenText<'a> {
    studio: &'a Studio,
    text: String,
    settings: GenerationSettings,
}

impl<'a> GenText<'a> {
    pub fn new(studio: &'a Studio, text: impl Into<String>) -> Self {
        Self::with_text(studio, text.into(), studio.settings())
    }

    fn with_text(studio: &'a Studio, text: String, settings: GenerationSettings) -> Self {
        Self {
            studio,
            text,
            settings,
        }
    }

    /// Start a chain from a free-form subject and instruction.
    pub async fn imagine(studio: &'a Studio, subject: &str, prompt: &str) -> Result<Self> {
        let settings = studio.settings();
        let text = studio.imagine(subject, prompt, &settings).await?;
        Ok(Self::with_text(studio, text, settings))
    }

    pub fn with_settings(&self, settings: GenerationSettings) -> Self {
        Self {
            settings,
            ..self.clone()
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn settings(&self) -> GenerationSettings {
        self.settings
    }

    pub fn into_text(self) -> String {
        self.text
    }

    pub async fn restyle(&self, style: &str) -> Result<Self> {
        let text = self
            .studio
            .restyle(&self.text, style, &self.settings)
            .await?;
        Ok(self.derive(text))
    }

    /// Blend this text with `other`; `strength` is this text's weight in percent.
    pub async fn blend(&self, other: &str, strength: u8) -> Result<Self> {
        let text = self
            .studio
            .blend(&self.text, other, strength, &self.settings)
            .await?;
        Ok(self.derive(text))
    }

    pub async fn mutate(&self, lens: &str) -> Result<Self> {
        let text = self.studio.mutate(&self.text, lens, &self.settings).await?;
        Ok(self.derive(text))
    }

    pub async fn generate(&self) -> Result<GenImage<'a>> {
        let image = self.studio.generate(&self.text).await?;
        Ok(GenImage {
            studio: self.studio,
            image,
        })
    }

    fn derive(&self, text: String) -> Self {
        Self::with_text(self.studio, text, self.settings)
    }
}

impl fmt::Display for GenText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// A rendered image waiting to be saved.
pub struct GenImage<'a> {
    studio: &'a Studio,
    image: GeneratedImage,
}

impl GenImage<'_> {
    pub fn image(&self) -> &GeneratedImage {
        &self.image
    }

    /// Save under the studio's output directory as `<prefix><n>.<ext>`.
    pub fn save(&self, prefix: &str) -> Result<PathBuf> {
        self.studio.save(&self.image, prefix)
    }
}

/// Snapshot of the stored files, refreshed after each upload.
pub struct FileLibrary<'a> {
    studio: &'a Studio,
    files: Vec<FileHandle>,
}

impl<'a> FileLibrary<'a> {
    pub async fn load(studio: &'a Studio) -> Result<Self> {
        let files = studio.list_files().await?;
        Ok(Self { studio, files })
    }

    pub async fn refresh(&mut self) -> Result<()> {
        self.files = self.studio.list_files().await?;
        Ok(())
    }

    pub fn list(&self) -> &[FileHandle] {
        &self.files
    }

    /// Look up a file by display name in the last snapshot.
    pub fn get(&self, display_name: &str) -> Option<GenFile<'a>> {
        self.files
            .iter()
            .find(|f| f.display_name.as_deref() == Some(display_name))
            .map(|f| GenFile::new(self.studio, f.clone()))
    }

    pub async fn upload(&mut self, path: &Path) -> Result<GenFile<'a>> {
        let file = self.studio.upload(path).await?;
        self.refresh().await?;
        Ok(GenFile::new(self.studio, file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{MockFileClient, MockImageGenerationClient, MockTextClient};
    use crate::models::ContentPart;
    use crate::studio::StudioServices;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn studio_with(text: MockTextClient, files: MockFileClient, output_dir: &Path) -> Studio {
        Studio::with_services(
            StudioServices {
                text: Box::new(text),
                images: Box::new(MockImageGenerationClient::new()),
                files: Box::new(files),
            },
            output_dir.to_path_buf(),
        )
    }

    #[tokio::test]
    async fn test_chain_feeds_previous_text_forward() {
        let dir = tempdir().unwrap();
        let text = MockTextClient::new()
            .with_text_response("a hammer".to_string())
            .with_text_response("an ink-wash hammer".to_string());
        let probe = text.clone();
        let studio = studio_with(text, MockFileClient::new(), dir.path());

        let imagined = GenText::imagine(&studio, "a jealous hammer", "describe it")
            .await
            .unwrap();
        let restyled = imagined.restyle("ink wash").await.unwrap();

        assert_eq!(imagined.text(), "a hammer");
        assert_eq!(restyled.to_string(), "an ink-wash hammer");

        let calls = probe.calls();
        let ContentPart::Text(sent) = &calls[1].parts[0] else {
            panic!("restyle should send a text part");
        };
        assert!(sent.contains("<input>a hammer</input>"));
    }

    #[tokio::test]
    async fn test_settings_propagate_through_chain() {
        let dir = tempdir().unwrap();
        let text = MockTextClient::new();
        let probe = text.clone();
        let studio = studio_with(text, MockFileClient::new(), dir.path());

        let custom = GenerationSettings {
            temperature: 0.3,
            top_k: 8,
            max_output_tokens: None,
        };
        let seed = GenText::new(&studio, "a comet").with_settings(custom);
        let mutated = seed.mutate("as a lullaby").await.unwrap();
        mutated.blend("a teacup", 50).await.unwrap();

        assert_eq!(mutated.settings(), custom);
        for call in probe.calls() {
            assert_eq!(call.settings, custom);
        }
        assert_eq!(seed.text(), "a comet");
    }

    #[tokio::test]
    async fn test_generate_then_save() {
        let dir = tempdir().unwrap();
        let studio = studio_with(MockTextClient::new(), MockFileClient::new(), dir.path());

        let path = GenText::new(&studio, "velvet frogs")
            .generate()
            .await
            .unwrap()
            .save("x")
            .unwrap();

        assert_eq!(path, dir.path().join("x1.png"));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_file_library_upload_refreshes_and_describes() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("owl.png");
        std::fs::write(&source, [0x89, 0x50, 0x4E, 0x47]).unwrap();

        let files = MockFileClient::new().with_file("seed.png");
        let files_probe = files.clone();
        let studio = studio_with(
            MockTextClient::new().with_text_response("an owl".to_string()),
            files,
            dir.path(),
        );

        let mut library = FileLibrary::load(&studio).await.unwrap();
        assert_eq!(library.list().len(), 1);
        assert!(library.get("owl.png").is_none());

        let owl = library.upload(&source).await.unwrap();
        assert_eq!(owl.file().display_name.as_deref(), Some("owl.png"));
        assert_eq!(library.list().len(), 2);
        assert_eq!(files_probe.get_list_count(), 2);

        let description = library
            .get("owl.png")
            .unwrap()
            .describe("")
            .await
            .unwrap();
        assert_eq!(description.text(), "an owl");
    }
}
