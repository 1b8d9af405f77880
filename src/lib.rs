//! Prompt-and-image toolkit over the Gemini API
//!
//! Uploads reference images, asks a text model to describe, style, restyle,
//! blend, mutate or imagine prompts, renders prompts with an image model, and
//! saves the results as sequentially numbered files.

pub mod ai;
pub mod error;
pub mod fluent;
pub mod models;
pub mod naming;
pub mod prompts;
pub mod studio;

pub use error::{Error, Result};
pub use naming::next_path;
pub use studio::{Studio, StudioServices};
