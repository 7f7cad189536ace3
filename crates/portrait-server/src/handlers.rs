//! HTTP Handlers

use axum::{
    extract::{
        multipart::{Multipart, MultipartError, MultipartRejection},
        rejection::JsonRejection,
        Query, Request, State,
    },
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use portrait_core::{
    prompt, resolve_styles, selection, ImageUpload, OrderIntent, PortraitError, PortraitResult,
    PortraitStudio, PortraitStyle,
};
use portrait_payments::{CheckoutGateway, CheckoutRequest, PaymentError};

use crate::config::ServerConfig;
use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub stripe_configured: bool,
    pub openai_configured: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionStatusQuery {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    pub paid: bool,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub styles: Vec<&'static str>,
    pub style_labels: Vec<&'static str>,
    pub delivery: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub portraits: Vec<PortraitResult>,
}

// ============================================================================
// Errors
// ============================================================================

/// Error answered as `{"message": ...}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    pub fn too_large(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                message: self.message,
            }),
        )
            .into_response()
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        if err.is_client_error() {
            Self::bad_request(err.user_message())
        } else {
            Self::internal(err.user_message())
        }
    }
}

impl From<PortraitError> for ApiError {
    fn from(err: PortraitError) -> Self {
        match err {
            PortraitError::InvalidOrder(_) => Self::bad_request(err.user_message()),
            _ => Self::internal(err.user_message()),
        }
    }
}

/// Relay Stripe's own message, or the endpoint's fallback when it gave none
fn payment_failure(err: PaymentError, fallback: &str) -> ApiError {
    match err {
        PaymentError::Stripe(msg) if !msg.is_empty() => ApiError::internal(msg),
        PaymentError::Stripe(_) | PaymentError::Metadata(_) => ApiError::internal(fallback),
        other => ApiError::from(other),
    }
}

const MISSING_STRIPE_KEY: &str = "Missing STRIPE_API_KEY environment variable";

impl AppState {
    fn payments(&self) -> Result<&dyn CheckoutGateway, ApiError> {
        self.payments
            .as_deref()
            .ok_or_else(|| ApiError::internal(MISSING_STRIPE_KEY))
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Every page and API route needs Stripe; refuse them all when it is missing
pub async fn require_payments(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if state.payments.is_none() {
        tracing::error!(path = %request.uri().path(), "{}", MISSING_STRIPE_KEY);
        return (StatusCode::INTERNAL_SERVER_ERROR, MISSING_STRIPE_KEY).into_response();
    }
    next.run(request).await
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        stripe_configured: state.payments.is_some(),
        openai_configured: state.studio.is_some(),
    })
}

/// Create Stripe checkout session
pub async fn create_checkout_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let payments = state.payments()?;

    let Json(payload) = payload.map_err(|_| ApiError::bad_request("Expected JSON payload."))?;

    let order = OrderIntent::from_json(&payload).map_err(|e| {
        tracing::warn!("Rejected checkout: {}", e);
        ApiError::from(e)
    })?;

    let origin = request_origin(&state.config, &headers);
    let request = CheckoutRequest {
        order,
        success_url: format!("{}/success?session_id={{CHECKOUT_SESSION_ID}}", origin),
        cancel_url: format!("{}/?canceled=true", origin),
    };

    let session = payments.create_checkout_session(request).await.map_err(|e| {
        tracing::error!("Stripe checkout session error: {}", e);
        payment_failure(e, "Unable to create checkout session.")
    })?;

    Ok(Json(CheckoutResponse {
        url: session.checkout_url,
    }))
}

/// Report payment status and purchased selections for a session
pub async fn session_status(
    State(state): State<AppState>,
    Query(query): Query<SessionStatusQuery>,
) -> Result<Json<SessionStatusResponse>, ApiError> {
    let payments = state.payments()?;

    let session_id = query
        .session_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing session_id query parameter."))?;

    let session = payments.retrieve_session(&session_id).await.map_err(|e| {
        tracing::error!(session_id = %session_id, "Stripe session retrieve error: {}", e);
        payment_failure(e, "Unable to retrieve checkout session.")
    })?;

    let purchase = session.purchase();

    Ok(Json(SessionStatusResponse {
        paid: session.paid,
        email: session.customer_email.clone(),
        style_labels: purchase.style_labels(),
        styles: purchase.style_keys(),
        delivery: purchase.delivery_keys(),
        first_name: purchase.first_name,
        last_name: purchase.last_name,
    }))
}

/// Generate one portrait per purchased style from the uploaded photo
pub async fn generate_portrait(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let studio = state
        .studio
        .clone()
        .ok_or_else(|| ApiError::internal("OpenAI is not configured."))?;

    let mut multipart =
        multipart.map_err(|_| ApiError::bad_request("Expected multipart form-data."))?;
    let form = GenerationForm::read(&mut multipart).await.map_err(|e| {
        tracing::warn!("Unreadable generation form: {}", e);
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::too_large("Pet image is too large.")
        } else {
            ApiError::bad_request("Expected multipart form-data.")
        }
    })?;

    let payments = state.payments()?;
    let portraits = run_generation(payments, &studio, form).await?;

    Ok(Json(GenerateResponse { portraits }))
}

// ============================================================================
// Generation
// ============================================================================

/// The uploaded photo as it arrived
#[derive(Debug, Default)]
enum PetImage {
    #[default]
    Missing,

    /// Present but not a usable file
    Invalid,

    Upload(ImageUpload),
}

/// Fields of the generation form
#[derive(Debug, Default)]
struct GenerationForm {
    session_id: String,
    email: String,
    first_name: String,
    last_name: String,
    pet_image: PetImage,
    styles: Vec<String>,
}

impl GenerationForm {
    async fn read(multipart: &mut Multipart) -> Result<Self, MultipartError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "sessionId" => form.session_id = field.text().await?.trim().to_string(),
                "email" => form.email = field.text().await?.trim().to_string(),
                "firstName" => form.first_name = field.text().await?,
                "lastName" => form.last_name = field.text().await?,
                "styles" | "styles[]" => form.styles.push(field.text().await?),
                "petImage" => {
                    let file_name = field.file_name().map(str::to_string);
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await?;

                    form.pet_image = match file_name {
                        Some(_) if bytes.is_empty() => PetImage::Invalid,
                        Some(file_name) => PetImage::Upload(ImageUpload::new(
                            bytes.to_vec(),
                            if file_name.is_empty() { "pet-image.png".to_string() } else { file_name },
                            content_type.unwrap_or_else(|| "image/png".to_string()),
                        )),
                        None if bytes.is_empty() => PetImage::Missing,
                        None => PetImage::Invalid,
                    };
                }
                _ => {}
            }
        }

        Ok(form)
    }
}

/// Verify the payment, resolve styles and run the studio
async fn run_generation(
    payments: &dyn CheckoutGateway,
    studio: &PortraitStudio,
    form: GenerationForm,
) -> Result<Vec<PortraitResult>, ApiError> {
    if form.session_id.is_empty() || form.email.is_empty() || matches!(form.pet_image, PetImage::Missing) {
        return Err(ApiError::bad_request("Missing required form data."));
    }

    let PetImage::Upload(image) = form.pet_image else {
        return Err(ApiError::bad_request("A valid pet image file is required."));
    };

    let session = payments.retrieve_session(&form.session_id).await.map_err(|e| {
        tracing::error!(session_id = %form.session_id, "Portrait generation error: {}", e);
        payment_failure(e, "Failed to generate portrait.")
    })?;

    if !session.paid {
        tracing::warn!(session_id = %session.id, "Generation requested for unpaid session");
        return Err(ApiError::bad_request("Checkout session is not paid yet."));
    }

    if !session.email_matches(&form.email) {
        tracing::warn!(session_id = %session.id, "Generation email mismatch");
        return Err(ApiError::bad_request(
            "Session email does not match the submitted email.",
        ));
    }

    let purchase = session.purchase();
    let requested: Vec<PortraitStyle> = selection::normalize_form_values(&form.styles);
    let styles = resolve_styles(&requested, &purchase.styles);
    if styles.is_empty() {
        return Err(ApiError::bad_request(
            "No portrait styles were purchased with this session.",
        ));
    }

    let persona = prompt::persona(
        Some(form.first_name.as_str()),
        Some(form.last_name.as_str()),
        purchase.first_name.as_deref(),
        purchase.last_name.as_deref(),
    );

    let portraits = studio.generate(&image, &styles, &persona).await.map_err(|e| {
        tracing::error!(session_id = %session.id, "Portrait generation error: {}", e);
        ApiError::from(e)
    })?;

    tracing::info!(
        session_id = %session.id,
        portraits = portraits.len(),
        "Generated portraits"
    );

    Ok(portraits)
}

/// Origin for Stripe redirect URLs
fn request_origin(config: &ServerConfig, headers: &HeaderMap) -> String {
    if let Some(base) = &config.public_base_url {
        return base.clone();
    }

    let header_value = |name| headers.get(name).and_then(|v| v.to_str().ok());
    let host = header_value(header::HOST).unwrap_or("localhost:3000");
    let scheme = header_value(header::HeaderName::from_static("x-forwarded-proto"))
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .unwrap_or("http");

    format!("{}://{}", scheme, host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes;
    use async_trait::async_trait;
    use axum::{body::Body, http::Request as HttpRequest, Router};
    use portrait_core::{
        DeliveryOption, EditOptions, EditedImage, ImageEditProvider, ImageEditRequest,
    };
    use portrait_payments::{CheckoutSession, SessionSnapshot};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    // ------------------------------------------------------------------------
    // Fakes
    // ------------------------------------------------------------------------

    #[derive(Default)]
    struct FakeGateway {
        sessions: HashMap<String, SessionSnapshot>,
        created: Mutex<Vec<CheckoutRequest>>,
        create_error: Option<String>,
    }

    #[async_trait]
    impl CheckoutGateway for FakeGateway {
        async fn create_checkout_session(
            &self,
            request: CheckoutRequest,
        ) -> portrait_payments::Result<CheckoutSession> {
            if let Some(message) = &self.create_error {
                return Err(PaymentError::Stripe(message.clone()));
            }
            self.created.lock().unwrap().push(request);
            Ok(CheckoutSession {
                id: "cs_test_new".into(),
                checkout_url: "https://checkout.stripe.com/c/pay/cs_test_new".into(),
            })
        }

        async fn retrieve_session(&self, session_id: &str) -> portrait_payments::Result<SessionSnapshot> {
            self.sessions
                .get(session_id)
                .cloned()
                .ok_or_else(|| PaymentError::Stripe(format!("No such checkout.session: '{}'", session_id)))
        }
    }

    #[derive(Default)]
    struct FakeProvider {
        prompts: Mutex<Vec<String>>,
        error: Option<String>,
    }

    #[async_trait]
    impl ImageEditProvider for FakeProvider {
        fn name(&self) -> &str {
            "fake"
        }

        async fn edit_image(&self, request: ImageEditRequest<'_>) -> portrait_core::Result<EditedImage> {
            assert_eq!(request.image.bytes, b"PNGDATA");
            self.prompts.lock().unwrap().push(request.prompt);
            match &self.error {
                Some(message) => Err(PortraitError::Provider(message.clone())),
                None => Ok(EditedImage {
                    b64_json: "UE5H".into(),
                }),
            }
        }
    }

    fn paid_session(email: &str, styles: &[PortraitStyle]) -> SessionSnapshot {
        let order = OrderIntent {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: email.into(),
            styles: styles.to_vec(),
            delivery: vec![DeliveryOption::Digital],
        };
        SessionSnapshot {
            id: "cs_test_paid".into(),
            paid: true,
            customer_email: Some(email.into()),
            metadata: Some(order.to_metadata().unwrap()),
        }
    }

    fn app(gateway: Option<Arc<FakeGateway>>, provider: Option<Arc<FakeProvider>>) -> Router {
        app_with_config(gateway, provider, ServerConfig::default())
    }

    fn app_with_config(
        gateway: Option<Arc<FakeGateway>>,
        provider: Option<Arc<FakeProvider>>,
        config: ServerConfig,
    ) -> Router {
        let state = AppState {
            payments: gateway.map(|g| g as Arc<dyn CheckoutGateway>),
            studio: provider.map(|p| Arc::new(PortraitStudio::new(p, EditOptions::default()))),
            config: Arc::new(config),
        };
        routes::router(state)
    }

    async fn send(app: Router, request: HttpRequest<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn checkout_request(body: Value) -> HttpRequest<Body> {
        HttpRequest::post("/api/create-checkout-session")
            .header(header::HOST, "shop.test")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    const BOUNDARY: &str = "portrait-boundary";

    fn multipart_request(fields: &[(&str, &str)], image: Option<&[u8]>) -> HttpRequest<Body> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    BOUNDARY, name, value
                )
                .as_bytes(),
            );
        }
        if let Some(bytes) = image {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"petImage\"; filename=\"rex.png\"\r\nContent-Type: image/png\r\n\r\n",
                    BOUNDARY
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        HttpRequest::post("/api/generate-portrait")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn gateway_with(session: SessionSnapshot) -> Arc<FakeGateway> {
        let mut gateway = FakeGateway::default();
        gateway.sessions.insert(session.id.clone(), session);
        Arc::new(gateway)
    }

    // ------------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_missing_stripe_key_fails_every_page() {
        let requests = [
            HttpRequest::get("/").body(Body::empty()).unwrap(),
            HttpRequest::get("/success?session_id=cs_test_paid").body(Body::empty()).unwrap(),
            checkout_request(serde_json::json!({})),
            HttpRequest::get("/api/session-status?session_id=cs_test_paid")
                .body(Body::empty())
                .unwrap(),
            multipart_request(&[("sessionId", "cs_test_paid")], Some(b"PNGDATA")),
        ];

        for request in requests {
            let path = request.uri().path().to_string();
            let response = app(None, Some(Arc::new(FakeProvider::default())))
                .oneshot(request)
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR, "{}", path);
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
            assert_eq!(&bytes[..], MISSING_STRIPE_KEY.as_bytes(), "{}", path);
        }
    }

    #[tokio::test]
    async fn test_health_reports_configuration() {
        let (status, body) = send(
            app(None, None),
            HttpRequest::get("/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stripeConfigured"], false);
        assert_eq!(body["openaiConfigured"], false);
    }

    #[tokio::test]
    async fn test_pages_are_served() {
        let gateway = Arc::new(FakeGateway::default());
        for path in ["/", "/success"] {
            let response = app(Some(gateway.clone()), None)
                .oneshot(HttpRequest::get(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
            assert!(content_type.starts_with("text/html"));
        }
    }

    // ------------------------------------------------------------------------
    // Checkout
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_checkout_single_digital_portrait() {
        let gateway = Arc::new(FakeGateway::default());
        let (status, body) = send(
            app(Some(gateway.clone()), None),
            checkout_request(serde_json::json!({
                "firstName": "Ada",
                "lastName": "Lovelace",
                "email": "ada@example.com",
                "styles": ["realistic-painted"],
                "delivery": ["digital"],
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["url"], "https://checkout.stripe.com/c/pay/cs_test_new");

        let created = gateway.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        let items = created[0].order.line_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 1);
        assert_eq!(items[0].unit_amount, 499);
        assert_eq!(
            created[0].success_url,
            "http://shop.test/success?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(created[0].cancel_url, "http://shop.test/?canceled=true");
    }

    #[tokio::test]
    async fn test_checkout_rejects_empty_styles() {
        let gateway = Arc::new(FakeGateway::default());
        let (status, body) = send(
            app(Some(gateway.clone()), None),
            checkout_request(serde_json::json!({
                "firstName": "Ada",
                "lastName": "Lovelace",
                "email": "ada@example.com",
                "styles": [],
                "delivery": ["digital", "framed"],
            })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Please select at least one portrait style.");
        assert!(gateway.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_checkout_requires_json() {
        let request = HttpRequest::post("/api/create-checkout-session")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from("firstName=Ada"))
            .unwrap();
        let (status, body) = send(app(Some(Arc::new(FakeGateway::default())), None), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Expected JSON payload.");
    }

    #[tokio::test]
    async fn test_checkout_relays_stripe_message() {
        let gateway = Arc::new(FakeGateway {
            create_error: Some("Your account cannot currently make live charges.".into()),
            ..Default::default()
        });
        let (status, body) = send(
            app(Some(gateway), None),
            checkout_request(serde_json::json!({
                "firstName": "Ada",
                "lastName": "Lovelace",
                "email": "ada@example.com",
                "styles": "cartoon-pop",
                "delivery": "framed",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Your account cannot currently make live charges.");
    }

    // ------------------------------------------------------------------------
    // Session status
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_session_status_requires_id() {
        let (status, body) = send(
            app(Some(Arc::new(FakeGateway::default())), None),
            HttpRequest::get("/api/session-status").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Missing session_id query parameter.");
    }

    #[tokio::test]
    async fn test_session_status_echoes_purchase() {
        let session = paid_session(
            "ada@example.com",
            &[PortraitStyle::CartoonPop, PortraitStyle::RoyalCostume],
        );
        let (status, body) = send(
            app(Some(gateway_with(session)), None),
            HttpRequest::get("/api/session-status?session_id=cs_test_paid")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["paid"], true);
        assert_eq!(body["email"], "ada@example.com");
        assert_eq!(body["firstName"], "Ada");
        assert_eq!(body["styles"], serde_json::json!(["cartoon-pop", "royal-costume"]));
        assert_eq!(body["styleLabels"], serde_json::json!(["Cartoon Pop", "Royal Costume"]));
        assert_eq!(body["delivery"], serde_json::json!(["digital"]));
    }

    #[tokio::test]
    async fn test_session_status_relays_lookup_failure() {
        let (status, body) = send(
            app(Some(Arc::new(FakeGateway::default())), None),
            HttpRequest::get("/api/session-status?session_id=cs_test_missing")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "No such checkout.session: 'cs_test_missing'");
    }

    // ------------------------------------------------------------------------
    // Generation
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_generation_requires_openai() {
        let session = paid_session("ada@example.com", &[PortraitStyle::RoyalCostume]);
        let (status, body) = send(
            app(Some(gateway_with(session)), None),
            multipart_request(
                &[("sessionId", "cs_test_paid"), ("email", "ada@example.com")],
                Some(b"PNGDATA"),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "OpenAI is not configured.");
    }

    #[tokio::test]
    async fn test_generation_requires_multipart() {
        let provider = Arc::new(FakeProvider::default());
        let request = HttpRequest::post("/api/generate-portrait")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let (status, body) = send(
            app(Some(Arc::new(FakeGateway::default())), Some(provider)),
            request,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Expected multipart form-data.");
    }

    #[tokio::test]
    async fn test_generation_requires_image() {
        let session = paid_session("ada@example.com", &[PortraitStyle::RoyalCostume]);
        let provider = Arc::new(FakeProvider::default());
        let (status, body) = send(
            app(Some(gateway_with(session)), Some(provider.clone())),
            multipart_request(&[("sessionId", "cs_test_paid"), ("email", "ada@example.com")], None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Missing required form data.");

        let session = paid_session("ada@example.com", &[PortraitStyle::RoyalCostume]);
        let (status, body) = send(
            app(Some(gateway_with(session)), Some(provider.clone())),
            multipart_request(
                &[("sessionId", "cs_test_paid"), ("email", "ada@example.com")],
                Some(b""),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "A valid pet image file is required.");
        assert!(provider.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generation_rejects_oversized_upload() {
        let session = paid_session("ada@example.com", &[PortraitStyle::RoyalCostume]);
        let provider = Arc::new(FakeProvider::default());
        let config = ServerConfig {
            max_upload_bytes: 1024,
            ..Default::default()
        };
        let image = vec![0u8; 4096];

        let (status, body) = send(
            app_with_config(Some(gateway_with(session)), Some(provider.clone()), config),
            multipart_request(
                &[("sessionId", "cs_test_paid"), ("email", "ada@example.com")],
                Some(image.as_slice()),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["message"], "Pet image is too large.");
        assert!(provider.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generation_rejects_unpaid_session() {
        let mut session = paid_session("ada@example.com", &[PortraitStyle::RoyalCostume]);
        session.paid = false;
        let provider = Arc::new(FakeProvider::default());

        let (status, body) = send(
            app(Some(gateway_with(session)), Some(provider.clone())),
            multipart_request(
                &[("sessionId", "cs_test_paid"), ("email", "ada@example.com")],
                Some(b"PNGDATA"),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Checkout session is not paid yet.");
        assert!(provider.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generation_rejects_other_email() {
        let session = paid_session("ada@example.com", &[PortraitStyle::RoyalCostume]);
        let provider = Arc::new(FakeProvider::default());

        let (status, body) = send(
            app(Some(gateway_with(session)), Some(provider.clone())),
            multipart_request(
                &[("sessionId", "cs_test_paid"), ("email", "mallory@example.com")],
                Some(b"PNGDATA"),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Session email does not match the submitted email.");
        assert!(provider.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generation_email_match_ignores_case() {
        let session = paid_session("a@x.com", &[PortraitStyle::RealisticPainted]);
        let provider = Arc::new(FakeProvider::default());

        let (status, body) = send(
            app(Some(gateway_with(session)), Some(provider.clone())),
            multipart_request(
                &[
                    ("sessionId", "cs_test_paid"),
                    ("email", "A@X.COM"),
                    ("firstName", "Grace"),
                    ("styles", "realistic-painted"),
                ],
                Some(b"PNGDATA"),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let portraits = body["portraits"].as_array().unwrap();
        assert_eq!(portraits.len(), 1);
        assert_eq!(portraits[0]["style"], "realistic-painted");
        assert_eq!(portraits[0]["label"], "Realistic Painted");
        assert_eq!(portraits[0]["imageBase64"], "UE5H");

        // Submitted first name wins, last name falls back to checkout metadata
        let prompts = provider.prompts.lock().unwrap();
        assert!(prompts[0].contains("\"Grace Lovelace\""));
    }

    #[tokio::test]
    async fn test_generation_filters_to_purchased_styles() {
        let session = paid_session(
            "ada@example.com",
            &[PortraitStyle::RoyalCostume, PortraitStyle::CartoonPop, PortraitStyle::WatercolorDream],
        );
        let provider = Arc::new(FakeProvider::default());

        let (status, body) = send(
            app(Some(gateway_with(session)), Some(provider)),
            multipart_request(
                &[
                    ("sessionId", "cs_test_paid"),
                    ("email", "ada@example.com"),
                    ("styles", "watercolor-dream"),
                    ("styles", "renaissance-oil"),
                    ("styles", "royal-costume"),
                ],
                Some(b"PNGDATA"),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let styles: Vec<&str> = body["portraits"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["style"].as_str().unwrap())
            .collect();
        assert_eq!(styles, vec!["watercolor-dream", "royal-costume"]);
    }

    #[tokio::test]
    async fn test_generation_disjoint_styles_fall_back_to_purchase() {
        let session = paid_session(
            "ada@example.com",
            &[PortraitStyle::RoyalCostume, PortraitStyle::CartoonPop],
        );
        let provider = Arc::new(FakeProvider::default());

        let (status, body) = send(
            app(Some(gateway_with(session)), Some(provider.clone())),
            multipart_request(
                &[
                    ("sessionId", "cs_test_paid"),
                    ("email", "ada@example.com"),
                    ("styles", "renaissance-oil"),
                ],
                Some(b"PNGDATA"),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let portraits = body["portraits"].as_array().unwrap();
        assert_eq!(portraits.len(), 2);
        assert_eq!(portraits[0]["style"], "royal-costume");
        assert_eq!(portraits[1]["style"], "cartoon-pop");
        assert_eq!(provider.prompts.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_generation_relays_provider_error() {
        let session = paid_session("ada@example.com", &[PortraitStyle::RoyalCostume]);
        let provider = Arc::new(FakeProvider {
            error: Some("Your request was rejected by the safety system.".into()),
            ..Default::default()
        });

        let (status, body) = send(
            app(Some(gateway_with(session)), Some(provider)),
            multipart_request(
                &[("sessionId", "cs_test_paid"), ("email", "ada@example.com")],
                Some(b"PNGDATA"),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Your request was rejected by the safety system.");
    }

    #[test]
    fn test_payment_failure_fallbacks() {
        let err = payment_failure(PaymentError::Stripe(String::new()), "Unable to retrieve checkout session.");
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Unable to retrieve checkout session.");

        let err = payment_failure(PaymentError::InvalidSession("bogus".into()), "unused");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Invalid session_id.");
    }

    #[test]
    fn test_origin_prefers_configured_base() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "internal:3000".parse().unwrap());
        headers.insert("x-forwarded-proto", "https, http".parse().unwrap());

        assert_eq!(
            request_origin(&ServerConfig::default(), &headers),
            "https://internal:3000"
        );

        let config = ServerConfig {
            public_base_url: Some("https://portraits.example.com".into()),
            ..Default::default()
        };
        assert_eq!(request_origin(&config, &headers), "https://portraits.example.com");
    }
}
