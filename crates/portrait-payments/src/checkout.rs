//! Stripe Checkout Integration
//!
//! Implements the "Stripe Checkout (Hosted)" approach: create a one-off
//! payment session for an order, then read it back after the redirect.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use portrait_core::{OrderIntent, PurchaseRecord, order::LineItem};
use serde::{Deserialize, Serialize};
use stripe::{
    CheckoutSession as StripeCheckoutSession, CheckoutSessionId, CheckoutSessionMode,
    CheckoutSessionPaymentStatus, Client, CreateCheckoutSession, CreateCheckoutSessionLineItems,
    CreateCheckoutSessionLineItemsPriceData, CreateCheckoutSessionLineItemsPriceDataProductData,
    CreateCheckoutSessionPaymentMethodTypes, Currency, RequestStrategy, StripeError,
};

use crate::error::{PaymentError, Result};

/// Stripe client configuration
#[derive(Clone, Debug)]
pub struct StripeConfig {
    pub secret_key: String,

    /// Network retries performed by the Stripe client
    pub max_network_retries: u32,

    /// Upper bound for a single Stripe call, in seconds
    pub timeout_secs: u64,
}

impl StripeConfig {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            max_network_retries: 3,
            timeout_secs: 30,
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `STRIPE_API_KEY` wins over the `STRIPE_SECRET_KEY` alias
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        ["STRIPE_API_KEY", "STRIPE_SECRET_KEY"]
            .into_iter()
            .find_map(|key| lookup(key).filter(|v| !v.trim().is_empty()))
            .map(Self::new)
            .ok_or_else(|| PaymentError::Config("Missing STRIPE_API_KEY environment variable".into()))
    }
}

/// Request to create a checkout session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Validated order
    pub order: OrderIntent,

    /// URL to redirect after successful payment
    pub success_url: String,

    /// URL to redirect if checkout is cancelled
    pub cancel_url: String,
}

/// Result of creating a checkout session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Stripe session ID
    pub id: String,

    /// URL to redirect user to
    pub checkout_url: String,
}

/// The parts of a Stripe checkout session this service reads
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: String,

    /// `payment_status == paid`
    pub paid: bool,

    /// Email the customer paid with
    pub customer_email: Option<String>,

    pub metadata: Option<HashMap<String, String>>,
}

impl SessionSnapshot {
    /// Selections recorded at checkout
    pub fn purchase(&self) -> PurchaseRecord {
        PurchaseRecord::from_metadata(self.metadata.as_ref())
    }

    /// Case-insensitive email check; sessions without an email match anything
    pub fn email_matches(&self, email: &str) -> bool {
        self.customer_email
            .as_deref()
            .is_none_or(|recorded| recorded.trim().to_lowercase() == email.trim().to_lowercase())
    }
}

/// Payment provider operations used by the HTTP layer
#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    /// Create a hosted checkout session and return its redirect URL
    async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession>;

    /// Fetch a checkout session by id
    async fn retrieve_session(&self, session_id: &str) -> Result<SessionSnapshot>;
}

/// Stripe client wrapper
pub struct StripeClient {
    client: Client,
    timeout: Duration,
}

impl StripeClient {
    /// Create a new Stripe client
    pub fn new(config: &StripeConfig) -> Self {
        let client = Client::new(config.secret_key.clone())
            .with_app_info(
                env!("CARGO_PKG_NAME").to_string(),
                Some(env!("CARGO_PKG_VERSION").to_string()),
                None,
            )
            .with_strategy(RequestStrategy::Retry(config.max_network_retries));

        Self {
            client,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(&StripeConfig::from_env()?))
    }

    async fn bounded<T>(
        &self,
        call: impl std::future::Future<Output = std::result::Result<T, StripeError>>,
    ) -> Result<T> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| PaymentError::Timeout(self.timeout.as_secs()))?
            .map_err(stripe_error)
    }
}

#[async_trait]
impl CheckoutGateway for StripeClient {
    async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession> {
        let order = &request.order;

        let mut params = CreateCheckoutSession::new();
        params.customer_email = Some(order.email.as_str());
        params.success_url = Some(request.success_url.as_str());
        params.cancel_url = Some(request.cancel_url.as_str());
        params.mode = Some(CheckoutSessionMode::Payment);
        params.payment_method_types = Some(vec![CreateCheckoutSessionPaymentMethodTypes::Card]);

        // Metadata values are flat strings; selections travel JSON-encoded
        params.metadata = Some(order.to_metadata()?);

        params.line_items = Some(order.line_items().iter().map(stripe_line_item).collect());

        let session = self
            .bounded(StripeCheckoutSession::create(&self.client, params))
            .await?;

        let checkout_url = session
            .url
            .ok_or_else(|| PaymentError::Stripe("No checkout URL returned".into()))?;

        tracing::info!(
            session_id = %session.id,
            styles = order.styles.len(),
            delivery = order.delivery.len(),
            amount = order.total_amount(),
            "Created checkout session"
        );

        Ok(CheckoutSession {
            id: session.id.to_string(),
            checkout_url,
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<SessionSnapshot> {
        let id: CheckoutSessionId = session_id
            .parse()
            .map_err(|_| PaymentError::InvalidSession(session_id.to_string()))?;

        let session = self
            .bounded(StripeCheckoutSession::retrieve(&self.client, &id, &[]))
            .await?;

        let customer_email = session
            .customer_details
            .as_ref()
            .and_then(|details| details.email.clone())
            .or(session.customer_email);

        Ok(SessionSnapshot {
            id: session.id.to_string(),
            paid: session.payment_status == CheckoutSessionPaymentStatus::Paid,
            customer_email,
            metadata: session.metadata,
        })
    }
}

/// Translate a priced line into Stripe's inline price data
fn stripe_line_item(item: &LineItem) -> CreateCheckoutSessionLineItems {
    CreateCheckoutSessionLineItems {
        quantity: Some(item.quantity),
        price_data: Some(CreateCheckoutSessionLineItemsPriceData {
            currency: Currency::USD,
            unit_amount: Some(item.unit_amount),
            product_data: Some(CreateCheckoutSessionLineItemsPriceDataProductData {
                name: item.name.clone(),
                description: Some(item.description.clone()),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Prefer the message Stripe reported over the transport description
fn stripe_error(err: StripeError) -> PaymentError {
    match err {
        StripeError::Stripe(request_error) => PaymentError::Stripe(
            request_error
                .message
                .unwrap_or_else(|| format!("Stripe returned HTTP {}", request_error.http_status)),
        ),
        other => PaymentError::Stripe(other.to_string()),
    }
}
