//! # Payment Events
//!
//! Webhook payloads from the payment provider. Only the handful of fields the
//! confirmation flows read are lifted out; the rest of the object is kept as
//! raw JSON for logging.

use crate::checkout::CheckoutIntent;
use crate::error::{IntakeError, IntakeResult};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Event types the dispatcher cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEventType {
    /// `checkout.session.completed`
    CheckoutCompleted,
    /// Anything else (acknowledged, not acted on)
    Other(String),
}

impl PaymentEventType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "checkout.session.completed" => PaymentEventType::CheckoutCompleted,
            other => PaymentEventType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PaymentEventType::CheckoutCompleted => "checkout.session.completed",
            PaymentEventType::Other(raw) => raw,
        }
    }
}

/// A verified webhook event
#[derive(Debug, Clone)]
pub struct PaymentEvent {
    /// Provider event id (`evt_...`), used for replay detection
    pub id: String,
    pub event_type: PaymentEventType,
    pub created: Option<DateTime<Utc>>,
    /// `data.object`
    pub object: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    created: Option<i64>,
    data: RawEventData,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: Map<String, Value>,
}

impl PaymentEvent {
    /// Parse an event body. Call only after the signature has been checked.
    pub fn from_slice(payload: &[u8]) -> IntakeResult<Self> {
        let raw: RawEvent = serde_json::from_slice(payload)
            .map_err(|e| IntakeError::validation(format!("Malformed webhook payload: {e}")))?;

        Ok(Self {
            id: raw.id,
            event_type: PaymentEventType::parse(&raw.event_type),
            created: raw.created.and_then(|ts| DateTime::from_timestamp(ts, 0)),
            object: raw.data.object,
        })
    }
}

/// Fields of a completed checkout session used by the confirmation emails
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedCheckout {
    pub session_id: String,
    pub customer_email: Option<String>,
    /// Minor units
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    pub payment_status: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl CompletedCheckout {
    /// Lift the checkout fields out of an event
    pub fn from_event(event: &PaymentEvent) -> IntakeResult<Self> {
        let obj = &event.object;
        let text = |key: &str| obj.get(key).and_then(Value::as_str).map(String::from);

        let session_id = text("id")
            .ok_or_else(|| IntakeError::validation("Checkout session is missing its id"))?;

        let customer_email = text("customer_email").or_else(|| {
            obj.get("customer_details")
                .and_then(|cd| cd.get("email"))
                .and_then(Value::as_str)
                .map(String::from)
        });

        let metadata = obj
            .get("metadata")
            .and_then(Value::as_object)
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            session_id,
            customer_email,
            amount_total: obj.get("amount_total").and_then(Value::as_i64),
            currency: text("currency"),
            payment_status: text("payment_status"),
            metadata,
        })
    }

    /// `metadata.intent`, defaulting to `order`
    pub fn intent(&self) -> CheckoutIntent {
        CheckoutIntent::from_label(self.metadata.get("intent").map(String::as_str))
    }

    /// Metadata field, or `None` when absent or blank
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}
