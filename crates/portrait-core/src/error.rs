//! Error Types

use thiserror::Error;

/// Result type alias for portrait operations
pub type Result<T> = std::result::Result<T, PortraitError>;

/// Portrait error types
#[derive(Error, Debug)]
pub enum PortraitError {
    /// Image generation provider returned an error
    #[error("{0}")]
    Provider(String),

    /// Provider answered without any image payload
    #[error("OpenAI did not return image data.")]
    MissingImageData,

    /// Provider not reachable (connect failure, timeout)
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Order failed validation
    #[error("{0}")]
    InvalidOrder(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PortraitError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, PortraitError::ProviderUnavailable(_))
    }

    /// Convert to the message shown to the customer
    pub fn user_message(&self) -> String {
        match self {
            PortraitError::Provider(msg) | PortraitError::InvalidOrder(msg) if !msg.is_empty() => {
                msg.clone()
            }
            PortraitError::MissingImageData => self.to_string(),
            PortraitError::ProviderUnavailable(msg) => msg.clone(),
            _ => "Failed to generate portrait.".into(),
        }
    }
}
