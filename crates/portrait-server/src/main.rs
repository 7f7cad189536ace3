//! Pet portrait checkout server
//!
//! Axum-based server for the order page, Stripe Checkout, and portrait
//! generation through the OpenAI image edits API.

mod config;
mod handlers;
mod pages;
mod routes;
mod state;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use portrait_core::{ImageEditProvider, PortraitStudio};
use portrait_payments::{CheckoutGateway, StripeClient};
use portrait_runtime::OpenAiImageProvider;

use crate::config::ServerConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();

    // Initialize payments
    let payments: Option<Arc<dyn CheckoutGateway>> = match StripeClient::from_env() {
        Ok(client) => {
            tracing::info!("✓ Stripe configured");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!("⚠ {} - every page will answer 500", e);
            tracing::warn!("  Set STRIPE_API_KEY in .env");
            None
        }
    };

    // Initialize image generation
    let studio = match OpenAiImageProvider::from_env()? {
        Some(provider) => {
            let options = provider.config().edit_options.clone();
            tracing::info!(model = %options.model, "✓ OpenAI configured");
            let provider: Arc<dyn ImageEditProvider> = Arc::new(provider);
            Some(Arc::new(PortraitStudio::new(provider, options)))
        }
        None => {
            tracing::warn!("⚠ OpenAI not configured - portrait generation disabled");
            tracing::warn!("  Set OPENAI_API_KEY in .env");
            None
        }
    };

    let addr = config.bind_addr.clone();

    // Build application state
    let state = AppState {
        payments,
        studio,
        config: Arc::new(config),
    };

    let app = routes::router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🐾 portrait server running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /                            - Order page");
    tracing::info!("  GET  /success                     - Upload & generate page");
    tracing::info!("  GET  /health                      - Health check");
    tracing::info!("  POST /api/create-checkout-session - Create Stripe checkout");
    tracing::info!("  GET  /api/session-status          - Payment status");
    tracing::info!("  POST /api/generate-portrait       - Generate portraits");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
