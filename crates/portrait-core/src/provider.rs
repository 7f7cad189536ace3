//! Image Provider Strategy Pattern
//!
//! Defines the interface the portrait studio uses to talk to an image
//! generation backend. The OpenAI implementation lives in
//! `portrait-runtime`; tests substitute their own.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// An uploaded source photo
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,

    /// Client-supplied file name
    pub file_name: String,

    /// MIME type, e.g. `image/png`
    pub content_type: String,
}

impl ImageUpload {
    pub fn new(bytes: Vec<u8>, file_name: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            file_name: file_name.into(),
            content_type: content_type.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Fixed rendering parameters sent with every edit
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditOptions {
    /// Model identifier (e.g., "gpt-image-1")
    pub model: String,

    /// Output dimensions, e.g. "1024x1024"
    pub size: String,

    /// Output encoding, e.g. "png"
    pub output_format: String,
}

impl Default for EditOptions {
    fn default() -> Self {
        Self {
            model: "gpt-image-1".into(),
            size: "1024x1024".into(),
            output_format: "png".into(),
        }
    }
}

/// A single image-edit call
#[derive(Clone, Debug)]
pub struct ImageEditRequest<'a> {
    pub image: &'a ImageUpload,
    pub prompt: String,
    pub options: &'a EditOptions,
}

/// Result of an image edit
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditedImage {
    /// Base64-encoded image bytes as returned by the provider
    pub b64_json: String,
}

/// Strategy trait for image generation providers
#[async_trait]
pub trait ImageEditProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &str;

    /// Edit the source image according to the prompt
    async fn edit_image(&self, request: ImageEditRequest<'_>) -> Result<EditedImage>;
}
