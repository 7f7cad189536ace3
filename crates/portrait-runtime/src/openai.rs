//! OpenAI Image Provider
//!
//! Implementation of `ImageEditProvider` for the OpenAI image edits endpoint.
//! Requests carry a fixed timeout and are retried a fixed number of times on
//! connection failures and transient statuses, the same policy the official
//! SDKs apply.

use std::time::Duration;

use async_trait::async_trait;
use portrait_core::{
    error::{PortraitError, Result},
    provider::{EditedImage, EditOptions, ImageEditProvider, ImageEditRequest},
};
use reqwest::{
    multipart::{Form, Part},
    Client, StatusCode,
};
use serde::Deserialize;

/// OpenAI provider configuration
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    pub api_key: String,

    /// API base URL, without trailing slash
    pub base_url: String,

    /// Image model and output parameters
    pub edit_options: EditOptions,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Retries after the first attempt
    pub max_retries: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".into(),
            edit_options: EditOptions::default(),
            timeout_secs: 600,
            max_retries: 2,
        }
    }
}

impl OpenAiConfig {
    /// Read configuration from the environment.
    ///
    /// Returns `None` when `OPENAI_API_KEY` is unset or blank.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let api_key = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty())?;
        let defaults = Self::default();

        let base_url = lookup("OPENAI_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.base_url);
        let model = lookup("OPENAI_IMAGE_MODEL").unwrap_or(defaults.edit_options.model);
        let timeout_secs = lookup("OPENAI_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.timeout_secs);
        let max_retries = lookup("OPENAI_MAX_RETRIES")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_retries);

        Some(Self {
            api_key,
            base_url,
            edit_options: EditOptions {
                model,
                ..defaults.edit_options
            },
            timeout_secs,
            max_retries,
        })
    }
}

/// OpenAI image-edit provider
pub struct OpenAiImageProvider {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiImageProvider {
    /// Create from configuration
    pub fn from_config(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PortraitError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Create from environment variables, if a key is configured
    pub fn from_env() -> Result<Option<Self>> {
        OpenAiConfig::from_env().map(Self::from_config).transpose()
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    fn edits_url(&self) -> String {
        format!("{}/images/edits", self.config.base_url)
    }

    /// Build the multipart body for one edit call
    fn build_form(request: &ImageEditRequest<'_>) -> Result<Form> {
        let image = Part::bytes(request.image.bytes.clone())
            .file_name(request.image.file_name.clone())
            .mime_str(&request.image.content_type)
            .map_err(|e| PortraitError::Provider(format!("Invalid image content type: {}", e)))?;

        Ok(Form::new()
            .text("model", request.options.model.clone())
            .text("prompt", request.prompt.clone())
            .text("size", request.options.size.clone())
            .text("output_format", request.options.output_format.clone())
            .text("n", "1")
            .part("image", image))
    }

    async fn send_once(&self, request: &ImageEditRequest<'_>) -> Result<EditedImage> {
        let form = Self::build_form(request)?;

        let response = self
            .client
            .post(self.edits_url())
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| PortraitError::ProviderUnavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PortraitError::ProviderUnavailable(e.to_string()))?;

        parse_response(status, &body)
    }
}

#[async_trait]
impl ImageEditProvider for OpenAiImageProvider {
    fn name(&self) -> &str {
        "OpenAI"
    }

    async fn edit_image(&self, request: ImageEditRequest<'_>) -> Result<EditedImage> {
        let mut attempt = 0;
        loop {
            match self.send_once(&request).await {
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = retry_delay(attempt);
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying OpenAI image edit"
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }
}

/// Exponential backoff: 0.5s, 1s, 2s ... capped at 8s
fn retry_delay(attempt: u32) -> Duration {
    let millis = 500u64.saturating_mul(1u64 << attempt.saturating_sub(1).min(4));
    Duration::from_millis(millis.min(8_000))
}

fn is_transient(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 409 | 429) || status.is_server_error()
}

/// Map an HTTP response from the edits endpoint to a result
fn parse_response(status: StatusCode, body: &str) -> Result<EditedImage> {
    if !status.is_success() {
        let message = serde_json::from_str::<ApiErrorEnvelope>(body)
            .ok()
            .map(|envelope| envelope.error.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("OpenAI request failed with status {}", status));

        return Err(if is_transient(status) {
            PortraitError::ProviderUnavailable(message)
        } else {
            PortraitError::Provider(message)
        });
    }

    let parsed: ImagesResponse = serde_json::from_str(body)?;
    parsed
        .data
        .into_iter()
        .next()
        .and_then(|image| image.b64_json)
        .filter(|b64| !b64.is_empty())
        .map(|b64_json| EditedImage { b64_json })
        .ok_or(PortraitError::MissingImageData)
}

// --- OpenAI API response types ---

#[derive(Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Deserialize)]
struct ImageData {
    b64_json: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use portrait_core::provider::ImageUpload;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = OpenAiConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.edit_options.model, "gpt-image-1");
        assert_eq!(config.edit_options.size, "1024x1024");
        assert_eq!(config.max_retries, 2);
    }

    #[test]
    fn test_config_requires_key() {
        assert!(OpenAiConfig::from_lookup(lookup(&[])).is_none());
        assert!(OpenAiConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "  ")])).is_none());
    }

    #[test]
    fn test_config_overrides() {
        let config = OpenAiConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "http://localhost:8080/v1/"),
            ("OPENAI_MAX_RETRIES", "0"),
            ("OPENAI_TIMEOUT_SECS", "nope"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.timeout_secs, 600);
    }

    #[test]
    fn test_edits_url() {
        let provider = OpenAiImageProvider::from_config(OpenAiConfig::default()).unwrap();
        assert_eq!(provider.edits_url(), "https://api.openai.com/v1/images/edits");
    }

    #[test]
    fn test_form_rejects_bad_content_type() {
        let image = ImageUpload::new(vec![0u8; 4], "rex.png", "not a mime");
        let options = EditOptions::default();
        let request = ImageEditRequest {
            image: &image,
            prompt: "paint".into(),
            options: &options,
        };
        assert!(OpenAiImageProvider::build_form(&request).is_err());
    }

    #[test]
    fn test_parse_success() {
        let body = r#"{"created": 1, "data": [{"b64_json": "aGVsbG8="}]}"#;
        let image = parse_response(StatusCode::OK, body).unwrap();
        assert_eq!(image.b64_json, "aGVsbG8=");
    }

    #[test]
    fn test_parse_missing_image_data() {
        let err = parse_response(StatusCode::OK, r#"{"data": []}"#).unwrap_err();
        assert!(matches!(err, PortraitError::MissingImageData));
        assert_eq!(err.user_message(), "OpenAI did not return image data.");
    }

    #[test]
    fn test_parse_api_error_message() {
        let body = r#"{"error": {"message": "Invalid image file or mode", "type": "invalid_request_error"}}"#;
        let err = parse_response(StatusCode::BAD_REQUEST, body).unwrap_err();
        assert!(!err.is_retryable());
        assert_eq!(err.user_message(), "Invalid image file or mode");
    }

    #[test]
    fn test_transient_statuses_are_retryable() {
        let err = parse_response(StatusCode::TOO_MANY_REQUESTS, "rate limited").unwrap_err();
        assert!(err.is_retryable());
        let err = parse_response(StatusCode::BAD_GATEWAY, "").unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_retry_delay_backs_off() {
        assert_eq!(retry_delay(1), Duration::from_millis(500));
        assert_eq!(retry_delay(2), Duration::from_millis(1000));
        assert_eq!(retry_delay(10), Duration::from_millis(8000));
    }
}
