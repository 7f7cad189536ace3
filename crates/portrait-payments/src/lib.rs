//! # portrait-payments
//!
//! Payment processing for the pet portrait shop.
//!
//! ## Stripe Checkout (Hosted)
//!
//! **Flow:** Order page → Redirect to Stripe's hosted page → Redirect back
//! to the upload page with `?session_id=...`
//!
//! ```text
//! ┌─────────────┐     ┌─────────────────┐     ┌──────────────┐
//! │ Order Page  │────▶│  Stripe Hosted  │────▶│ Success Page │
//! │   (`/`)     │     │  Checkout Page  │     │  (`/success`)│
//! └─────────────┘     └─────────────────┘     └──────────────┘
//! ```
//!
//! Nothing is stored locally. The customer's style and delivery choices ride
//! along in the session metadata and are read back with
//! [`CheckoutGateway::retrieve_session`] before any portrait is generated.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use portrait_payments::{CheckoutGateway, CheckoutRequest, StripeClient};
//!
//! let client = StripeClient::from_env()?;
//!
//! let session = client.create_checkout_session(CheckoutRequest {
//!     order,
//!     success_url: "https://example.com/success?session_id={CHECKOUT_SESSION_ID}".into(),
//!     cancel_url: "https://example.com/?canceled=true".into(),
//! }).await?;
//!
//! // Redirect user to: session.checkout_url
//! ```

mod checkout;
mod error;

pub use checkout::{
    CheckoutGateway, CheckoutRequest, CheckoutSession, SessionSnapshot, StripeClient, StripeConfig,
};
pub use error::{PaymentError, Result};
