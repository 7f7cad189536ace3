//! Application State

use std::sync::Arc;

use portrait_core::PortraitStudio;
use portrait_payments::CheckoutGateway;

use crate::config::ServerConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Payment gateway (None if STRIPE_API_KEY is missing; every page then fails)
    pub payments: Option<Arc<dyn CheckoutGateway>>,

    /// Portrait studio (None if OPENAI_API_KEY is missing; generation disabled)
    pub studio: Option<Arc<PortraitStudio>>,

    pub config: Arc<ServerConfig>,
}
