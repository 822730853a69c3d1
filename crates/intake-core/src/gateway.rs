//! # Payment Gateway Trait
//!
//! Capability interface over the payment provider. The checkout and webhook
//! flows only see this trait, so they run against in-process doubles in
//! tests and against Stripe in production.
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │          PaymentGateway (trait)            │
//! │  ├── create_session()                      │
//! │  ├── verify_event()                        │
//! │  └── provider_name()                       │
//! └────────────────────────────────────────────┘
//!                      ▲
//!          ┌───────────┴───────────┐
//!  ┌───────┴───────┐       ┌───────┴───────┐
//!  │ StripeGateway │       │  test doubles │
//!  └───────────────┘       └───────────────┘
//! ```

use crate::checkout::{CheckoutSessionSpec, CreatedSession};
use crate::error::IntakeResult;
use crate::event::PaymentEvent;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a hosted checkout session for `spec`.
    ///
    /// Provider failures surface as `IntakeError::Upstream` carrying the
    /// provider's message.
    async fn create_session(&self, spec: &CheckoutSessionSpec) -> IntakeResult<CreatedSession>;

    /// Verify a webhook signature and parse the event.
    ///
    /// Must fail with `IntakeError::InvalidSignature` before reading any
    /// event data when the signature does not check out.
    async fn verify_event(&self, payload: &[u8], signature: &str) -> IntakeResult<PaymentEvent>;

    /// Provider name (for logging)
    fn provider_name(&self) -> &'static str;
}

/// Shared gateway handle
pub type SharedGateway = Arc<dyn PaymentGateway>;
