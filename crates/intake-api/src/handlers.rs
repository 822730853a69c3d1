//! # Request Handlers
//!
//! Axum request handlers for the intake API: storefront checkout, experience
//! inquiries and the Stripe webhook.

use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use intake_core::{CheckoutRequest, InquiryRequest, IntakeError, WebhookOutcome};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Create checkout response
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    /// Hosted checkout page (redirect the browser here)
    pub url: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Handler failure rendered as `{ "error": ... }`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Intake(#[from] IntakeError),

    #[error("Invalid request body: {0}")]
    Body(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Intake(e) => {
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            ApiError::Body(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Body(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }
        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Liveness text
pub async fn root() -> &'static str {
    "craft-intake is running"
}

/// Health check endpoint
pub async fn healthz() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// Experience inquiry: validate, notify the inbox, acknowledge the requester
#[instrument(skip(state, payload))]
pub async fn experience_inquiry(
    State(state): State<AppState>,
    payload: Result<Json<InquiryRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload?;
    let inquiry = request.validate()?;

    info!(
        "Inquiry received: kind={}, date={}, guests={}",
        inquiry.kind.label(),
        inquiry.date,
        inquiry.guests
    );

    state.notifier.send_inquiry(&inquiry).await?;

    Ok(Json(json!({ "ok": true })))
}

/// Open a hosted checkout session for an order or experience deposit
#[instrument(skip(state, payload))]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let Json(request) = payload?;
    let spec = state.checkout.build(&request)?;

    info!(
        "Creating checkout: intent={}, {} items, total={}",
        spec.intent(),
        spec.line_items.len(),
        spec.total()
    );

    let session = state.gateway.create_session(&spec).await?;

    info!("Created checkout session: {}", session.session_id);

    Ok(Json(CheckoutResponse { url: session.url }))
}

/// Handle Stripe webhook
///
/// Acknowledges as soon as the event is verified; confirmation email goes out
/// in a detached side task.
#[instrument(skip(state, headers, body))]
pub async fn webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let Some(signature) = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
    else {
        return webhook_error(IntakeError::InvalidSignature(
            "Missing Stripe-Signature header".to_string(),
        ));
    };

    match state.webhooks.handle(&body, signature).await {
        Ok(outcome) => {
            match outcome {
                WebhookOutcome::Dispatched { flow, task } => {
                    info!("Webhook dispatched: flow={}, task={}", flow, task.name());
                    task.detach();
                }
                WebhookOutcome::Duplicate { event_id } => {
                    info!("Webhook already handled: {}", event_id);
                }
                WebhookOutcome::Ignored { event_type } => {
                    info!("Webhook ignored: {}", event_type);
                }
            }
            (StatusCode::OK, "OK").into_response()
        }
        Err(e) => webhook_error(e),
    }
}

fn webhook_error(err: IntakeError) -> Response {
    error!("Webhook rejected: {}", err);
    (StatusCode::BAD_REQUEST, format!("Webhook Error: {err}")).into_response()
}
