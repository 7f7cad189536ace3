//! Router

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{
    create_checkout_session, generate_portrait, health_check, require_payments, session_status,
};
use crate::pages;
use crate::state::AppState;

/// Build the application router
pub fn router(state: AppState) -> Router {
    let max_upload = state.config.max_upload_bytes;

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let shop = Router::new()
        // Pages
        .route("/", get(pages::index))
        .route("/success", get(pages::success))

        // Checkout API
        .route("/api/create-checkout-session", post(create_checkout_session))
        .route("/api/session-status", get(session_status))
        .route("/api/generate-portrait", post(generate_portrait))

        .route_layer(middleware::from_fn_with_state(state.clone(), require_payments));

    Router::new()
        .route("/health", get(health_check))
        .merge(shop)
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
