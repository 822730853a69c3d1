//! # Routes
//!
//! Axum router configuration for the intake API.

use crate::handlers::{self, ErrorResponse};
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

/// Create the main application router
///
/// Routes:
/// - GET  /                        - Liveness text
/// - GET  /healthz                 - Health check
/// - POST /experience-inquiry      - House call / event inquiry
/// - POST /create-checkout-session - Order or deposit checkout
/// - POST /webhook                 - Stripe webhook (raw body)
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Skipping unusable origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/experience-inquiry", post(handlers::experience_inquiry))
        .route("/create-checkout-session", post(handlers::create_checkout_session))
        .route("/webhook", post(handlers::webhook))
        // Middleware
        .layer(middleware::from_fn_with_state(state.clone(), origin_guard))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}

/// Reject browser requests from origins outside the allow-list.
///
/// Requests without an `Origin` header (Stripe, curl) pass through.
async fn origin_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(origin) = request.headers().get(header::ORIGIN) {
        let allowed = origin
            .to_str()
            .map(|o| state.config.is_allowed_origin(o))
            .unwrap_or(false);

        if !allowed {
            warn!("Blocked request from origin {:?}", origin);
            return (
                StatusCode::FORBIDDEN,
                Json(ErrorResponse::new("Origin not allowed")),
            )
                .into_response();
        }
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppConfig;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use intake_core::{
        BusinessSettings, CheckoutSessionSpec, CreatedSession, EmailMessage, IntakeError,
        IntakeResult, Mailer, PaymentEvent, PaymentGateway,
    };
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tower::ServiceExt;

    const SHOP: &str = "https://shop.example.com";

    /// Records session specs; accepts webhook signature "good"
    #[derive(Default)]
    struct FakeGateway {
        sessions: Mutex<Vec<CheckoutSessionSpec>>,
        fail_with: Option<String>,
    }

    #[async_trait]
    impl PaymentGateway for FakeGateway {
        async fn create_session(&self, spec: &CheckoutSessionSpec) -> IntakeResult<CreatedSession> {
            if let Some(ref message) = self.fail_with {
                return Err(IntakeError::upstream("stripe", message.clone()));
            }
            self.sessions.lock().unwrap().push(spec.clone());
            Ok(CreatedSession {
                session_id: "cs_test_1".to_string(),
                url: "https://checkout.stripe.com/c/pay/cs_test_1".to_string(),
                expires_at: None,
            })
        }

        async fn verify_event(&self, payload: &[u8], signature: &str) -> IntakeResult<PaymentEvent> {
            if signature != "good" {
                return Err(IntakeError::InvalidSignature("Signature mismatch".to_string()));
            }
            PaymentEvent::from_slice(payload)
        }

        fn provider_name(&self) -> &'static str {
            "fake"
        }
    }

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<EmailMessage>>,
        fail: bool,
    }

    impl RecordingMailer {
        fn sent(&self) -> Vec<EmailMessage> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &EmailMessage) -> IntakeResult<()> {
            self.sent.lock().unwrap().push(message.clone());
            if self.fail {
                return Err(IntakeError::upstream("smtp", "relay refused"));
            }
            Ok(())
        }
    }

    struct Harness {
        app: Router,
        gateway: Arc<FakeGateway>,
        mailer: Arc<RecordingMailer>,
    }

    fn harness_with(gateway: FakeGateway, mailer: RecordingMailer) -> Harness {
        let gateway = Arc::new(gateway);
        let mailer = Arc::new(mailer);
        let config = AppConfig {
            host: "127.0.0.1".to_string(),
            port: 4242,
            frontend_url: SHOP.to_string(),
            environment: "test".to_string(),
            allowed_origins: vec![SHOP.to_string()],
            settings_path: "config/intake.toml".to_string(),
        };
        let settings = BusinessSettings::default()
            .with_inbox("inbox@example.com")
            .with_shipping_rate("shr_flat");
        let state = AppState::new(
            config,
            settings,
            gateway.clone(),
            mailer.clone(),
            "shop@example.com",
        );

        Harness {
            app: create_router(state),
            gateway,
            mailer,
        }
    }

    fn harness() -> Harness {
        harness_with(FakeGateway::default(), RecordingMailer::default())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn webhook_request(signature: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("stripe-signature", signature)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let (status, body) = send(app, request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn wait_for_mail(mailer: &RecordingMailer, count: usize) -> Vec<EmailMessage> {
        for _ in 0..100 {
            if mailer.sent().len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        mailer.sent()
    }

    fn completed_event(event_id: &str, metadata: Value) -> Value {
        json!({
            "id": event_id,
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": "cs_test_1",
                "customer_email": "buyer@example.com",
                "amount_total": 9000,
                "currency": "usd",
                "payment_status": "paid",
                "metadata": metadata
            }}
        })
    }

    #[tokio::test]
    async fn test_liveness_and_health() {
        let h = harness();

        let (status, body) = send(&h.app, Request::get("/").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body.is_empty());

        let (status, body) =
            send_json(&h.app, Request::get("/healthz").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true }));
    }

    #[tokio::test]
    async fn test_checkout_returns_url() {
        let h = harness();
        let (status, body) = send_json(
            &h.app,
            post_json(
                "/create-checkout-session",
                json!({
                    "customer_email": "buyer@example.com",
                    "fulfillment": "shipping",
                    "items": [{ "title": "Mug", "price": "$45.00+", "quantity": 2 }]
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["url"], "https://checkout.stripe.com/c/pay/cs_test_1");

        let sessions = h.gateway.sessions.lock().unwrap().clone();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].line_items[0].unit_amount, 4500);
        assert!(sessions[0].shipping.is_some());
        assert!(sessions[0].success_url.starts_with(SHOP));
    }

    #[tokio::test]
    async fn test_deposit_guest_count_out_of_range() {
        let h = harness();
        let (status, body) = send_json(
            &h.app,
            post_json(
                "/create-checkout-session",
                json!({
                    "customer_email": "guest@example.com",
                    "intent": "deposit",
                    "meta": { "guestCount": 6 }
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("between 2 and 5"));
        assert!(h.gateway.sessions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_checkout_provider_failure_is_500() {
        let h = harness_with(
            FakeGateway {
                fail_with: Some("No such shipping rate".to_string()),
                ..Default::default()
            },
            RecordingMailer::default(),
        );
        let (status, body) = send_json(
            &h.app,
            post_json(
                "/create-checkout-session",
                json!({
                    "customer_email": "buyer@example.com",
                    "items": [{ "title": "Mug", "priceCents": 3200 }]
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "stripe error: No such shipping rate");
    }

    #[tokio::test]
    async fn test_malformed_json_is_400() {
        let h = harness();
        let request = Request::builder()
            .method("POST")
            .uri("/experience-inquiry")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let (status, body) = send_json(&h.app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_inquiry_sends_notice_then_acknowledgment() {
        let h = harness();
        let (status, body) = send_json(
            &h.app,
            post_json(
                "/experience-inquiry",
                json!({
                    "type": "house",
                    "name": "Robin",
                    "email": "robin@example.com",
                    "date": "2026-11-14",
                    "guestCount": 99,
                    "location": "Portland"
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true }));

        let sent = h.mailer.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].to, "inbox@example.com");
        assert_eq!(sent[0].reply_to.as_deref(), Some("robin@example.com"));
        assert!(sent[0].body.contains("Guests: 2"));
        assert_eq!(sent[1].to, "robin@example.com");
    }

    #[tokio::test]
    async fn test_inquiry_validation_sends_nothing() {
        let h = harness();
        let (status, body) = send_json(
            &h.app,
            post_json(
                "/experience-inquiry",
                json!({
                    "type": "event",
                    "name": "Robin",
                    "email": "robin@example.com",
                    "date": "2026-11-14",
                    "location": "Portland"
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "A start time is required for events");
        assert!(h.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_inquiry_mail_failure_is_500() {
        let h = harness_with(
            FakeGateway::default(),
            RecordingMailer {
                fail: true,
                ..Default::default()
            },
        );
        let (status, body) = send_json(
            &h.app,
            post_json(
                "/experience-inquiry",
                json!({
                    "name": "Robin",
                    "email": "robin@example.com",
                    "date": "2026-11-14",
                    "location": "Portland"
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "smtp error: relay refused");
    }

    #[tokio::test]
    async fn test_webhook_bad_signature() {
        let h = harness();
        let (status, body) =
            send(&h.app, webhook_request("bad", completed_event("evt_1", json!({})))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(String::from_utf8(body).unwrap().starts_with("Webhook Error: "));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(h.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_webhook_missing_signature() {
        let h = harness();
        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .body(Body::from("{}"))
            .unwrap();

        let (status, body) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(String::from_utf8(body).unwrap().contains("Missing Stripe-Signature header"));
    }

    #[tokio::test]
    async fn test_webhook_deposit_confirmation_once() {
        let h = harness();
        let event = completed_event(
            "evt_dep",
            json!({ "intent": "deposit", "guestCount": "3", "date": "2026-11-14" }),
        );

        let (status, body) = send(&h.app, webhook_request("good", event.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"OK");

        let sent = wait_for_mail(&h.mailer, 1).await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "buyer@example.com");
        assert!(sent[0].body.contains("2026-11-14"));

        let (status, _) = send(&h.app, webhook_request("good", event)).await;
        assert_eq!(status, StatusCode::OK);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(h.mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_webhook_ack_survives_mail_failure() {
        let h = harness_with(
            FakeGateway::default(),
            RecordingMailer {
                fail: true,
                ..Default::default()
            },
        );

        let (status, body) =
            send(&h.app, webhook_request("good", completed_event("evt_ord", json!({})))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"OK");
        assert_eq!(wait_for_mail(&h.mailer, 1).await.len(), 1);
    }

    #[tokio::test]
    async fn test_foreign_origin_forbidden() {
        let h = harness();
        let request = Request::get("/healthz")
            .header(header::ORIGIN, "https://evil.example.com")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send_json(&h.app, request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Origin not allowed");
    }

    #[tokio::test]
    async fn test_allowed_origin_gets_cors_header() {
        let h = harness();
        let request = Request::get("/healthz")
            .header(header::ORIGIN, SHOP)
            .body(Body::empty())
            .unwrap();

        let response = h.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            SHOP
        );
    }
}
