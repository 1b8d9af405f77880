pub mod client;
pub mod files;
pub mod image;
pub mod text;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use files::GeminiFilesClient;
pub use image::GeminiImageClient;
pub use text::GeminiTextClient;

/// Adds a test-only `with_base_url` to a client that wraps a `GeminiHttpClient` in `http`.
#[cfg(test)]
macro_rules! impl_with_gemini_base_url {
    ($client:ty) => {
        impl $client {
            pub(crate) fn with_base_url(mut self, base_url: String) -> Self {
                self.http = self.http.with_base_url(base_url);
                self
            }
        }
    };
}

#[cfg(test)]
pub(crate) use impl_with_gemini_base_url;
