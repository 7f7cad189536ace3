//! Payment Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Stripe API error, carrying Stripe's own message
    #[error("Stripe error: {0}")]
    Stripe(String),

    /// Session id is not a Stripe checkout session id
    #[error("Invalid checkout session id: {0}")]
    InvalidSession(String),

    /// Stripe did not answer within the client timeout
    #[error("Stripe request timed out after {0}s")]
    Timeout(u64),

    /// Order could not be encoded into session metadata
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PaymentError {
    /// Whether the caller sent something unusable (as opposed to a server fault)
    pub fn is_client_error(&self) -> bool {
        matches!(self, PaymentError::InvalidSession(_))
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            PaymentError::Stripe(msg) if !msg.is_empty() => msg.clone(),
            PaymentError::InvalidSession(_) => "Invalid session_id.".into(),
            PaymentError::Timeout(_) => "Payment provider did not respond in time.".into(),
            PaymentError::Config(_) => "Service configuration error.".into(),
            _ => "An error occurred processing your request.".into(),
        }
    }
}

impl From<portrait_core::PortraitError> for PaymentError {
    fn from(err: portrait_core::PortraitError) -> Self {
        PaymentError::Metadata(err.to_string())
    }
}
