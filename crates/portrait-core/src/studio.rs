//! Portrait Studio
//!
//! Runs one image edit per style, strictly in order. The first failure
//! aborts the remaining styles.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{PortraitError, Result};
use crate::prompt;
use crate::provider::{EditOptions, ImageEditProvider, ImageEditRequest, ImageUpload};
use crate::style::PortraitStyle;

/// A finished portrait
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortraitResult {
    pub style: PortraitStyle,
    pub label: String,
    pub image_base64: String,
}

/// Generates portraits through an image provider
pub struct PortraitStudio {
    provider: Arc<dyn ImageEditProvider>,
    options: EditOptions,
}

impl PortraitStudio {
    pub fn new(provider: Arc<dyn ImageEditProvider>, options: EditOptions) -> Self {
        Self { provider, options }
    }

    /// Generate one portrait per style
    pub async fn generate(
        &self,
        image: &ImageUpload,
        styles: &[PortraitStyle],
        persona: &str,
    ) -> Result<Vec<PortraitResult>> {
        let mut portraits = Vec::with_capacity(styles.len());

        for style in styles {
            let prompt = prompt::build_prompt(*style, persona);
            tracing::info!(
                provider = self.provider.name(),
                style = %style,
                "Generating portrait"
            );

            let edited = self
                .provider
                .edit_image(ImageEditRequest {
                    image,
                    prompt,
                    options: &self.options,
                })
                .await?;

            if edited.b64_json.is_empty() {
                return Err(PortraitError::MissingImageData);
            }

            portraits.push(PortraitResult {
                style: *style,
                label: style.label().to_string(),
                image_base64: edited.b64_json,
            });
        }

        Ok(portraits)
    }
}
