//! # Stripe Checkout Gateway
//!
//! `PaymentGateway` over the Stripe Checkout Sessions API and webhook
//! signatures.

use crate::config::StripeConfig;
use crate::webhook::verify_signature;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use intake_core::{
    CheckoutSessionSpec, CreatedSession, IntakeError, IntakeResult, PaymentEvent, PaymentGateway,
};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

const PROVIDER: &str = "stripe";

/// Stripe Checkout Session gateway
///
/// Uses Stripe's hosted checkout page; card data never touches this service.
pub struct StripeGateway {
    config: StripeConfig,
    client: Client,
}

impl StripeGateway {
    /// Create a new Stripe gateway
    pub fn new(config: StripeConfig) -> IntakeResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| IntakeError::Configuration(format!("Failed to create HTTP client: {e}")))?;

        if config.is_test_mode() {
            info!("Stripe gateway running with test keys");
        } else {
            warn!("Stripe gateway running with LIVE keys");
        }

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> IntakeResult<Self> {
        Self::new(StripeConfig::from_env()?)
    }
}

/// Flatten a session spec into Stripe's bracketed form encoding
fn form_params(spec: &CheckoutSessionSpec) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = vec![
        ("mode".to_string(), spec.mode.as_str().to_string()),
        ("success_url".to_string(), spec.success_url.clone()),
        ("cancel_url".to_string(), spec.cancel_url.clone()),
        ("customer_email".to_string(), spec.customer_email.clone()),
    ];

    for (i, item) in spec.line_items.iter().enumerate() {
        let prefix = format!("line_items[{i}]");
        params.push((
            format!("{prefix}[price_data][currency]"),
            item.currency.clone(),
        ));
        params.push((
            format!("{prefix}[price_data][unit_amount]"),
            item.unit_amount.to_string(),
        ));
        params.push((
            format!("{prefix}[price_data][product_data][name]"),
            item.name.clone(),
        ));
        if let Some(ref desc) = item.description {
            params.push((
                format!("{prefix}[price_data][product_data][description]"),
                desc.clone(),
            ));
        }
        for (j, image) in item.images.iter().enumerate() {
            params.push((
                format!("{prefix}[price_data][product_data][images][{j}]"),
                image.clone(),
            ));
        }
        params.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
    }

    for (key, value) in &spec.metadata {
        params.push((format!("metadata[{key}]"), value.clone()));
    }

    if let Some(ref shipping) = spec.shipping {
        params.push((
            "shipping_options[0][shipping_rate]".to_string(),
            shipping.shipping_rate.clone(),
        ));
        for (i, country) in shipping.allowed_countries.iter().enumerate() {
            params.push((
                format!("shipping_address_collection[allowed_countries][{i}]"),
                country.clone(),
            ));
        }
    }

    params
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self, spec), fields(intent = %spec.intent(), items = spec.line_items.len()))]
    async fn create_session(&self, spec: &CheckoutSessionSpec) -> IntakeResult<CreatedSession> {
        let params = form_params(spec);
        debug!(
            "Creating Stripe checkout session: total={}, shipping={}",
            spec.total(),
            spec.shipping.is_some()
        );

        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .header("Idempotency-Key", &spec.idempotency_key)
            .form(&params)
            .send()
            .await
            .map_err(|e| IntakeError::upstream(PROVIDER, e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| IntakeError::upstream(PROVIDER, e.to_string()))?;

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);

            if let Ok(error_response) = serde_json::from_str::<StripeErrorResponse>(&body) {
                return Err(IntakeError::upstream(PROVIDER, error_response.error.message));
            }

            return Err(IntakeError::upstream(
                PROVIDER,
                format!("HTTP {status}: {body}"),
            ));
        }

        let session: StripeCheckoutSessionResponse = serde_json::from_str(&body).map_err(|e| {
            IntakeError::upstream(PROVIDER, format!("Failed to parse Stripe response: {e}"))
        })?;

        let url = session.url.ok_or_else(|| {
            IntakeError::upstream(PROVIDER, "Checkout session has no redirect URL")
        })?;

        info!("Created Stripe checkout session: id={}", session.id);

        Ok(CreatedSession {
            session_id: session.id,
            url,
            expires_at: session
                .expires_at
                .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
        })
    }

    #[instrument(skip(self, payload, signature))]
    async fn verify_event(&self, payload: &[u8], signature: &str) -> IntakeResult<PaymentEvent> {
        verify_signature(
            &self.config.webhook_secret,
            payload,
            signature,
            self.config.webhook_tolerance_secs,
            Utc::now().timestamp(),
        )?;

        let event = PaymentEvent::from_slice(payload)?;
        debug!("Verified Stripe webhook: type={}", event.event_type.as_str());
        Ok(event)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeCheckoutSessionResponse {
    id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    expires_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: String,
}
