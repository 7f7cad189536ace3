//! # portrait-runtime
//!
//! Image generation providers for the portrait studio.
//!
//! ## Providers
//!
//! - **OpenAI** (default): image edits via the OpenAI Images API
//!
//! ## Usage
//!
//! ```rust,ignore
//! use portrait_runtime::OpenAiImageProvider;
//!
//! if let Some(provider) = OpenAiImageProvider::from_env()? {
//!     let options = provider.config().edit_options.clone();
//!     let studio = PortraitStudio::new(Arc::new(provider), options);
//! }
//! ```

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "openai")]
pub use openai::{OpenAiConfig, OpenAiImageProvider};

// Re-export core types for convenience
pub use portrait_core::{
    EditOptions, EditedImage, ImageEditProvider, ImageEditRequest, ImageUpload, PortraitError,
    PortraitStudio, Result,
};
