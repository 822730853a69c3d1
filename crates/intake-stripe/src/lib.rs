//! # intake-stripe
//!
//! Stripe gateway for craft-intake.
//!
//! `StripeGateway` implements `intake_core::PaymentGateway` on top of the
//! Checkout Sessions API:
//! - dynamic `price_data` line items
//! - customer email prefill
//! - metadata carrying the checkout intent and booking details
//! - fixed shipping rate and country restriction for shipped orders
//! - webhook signature verification
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use intake_stripe::StripeGateway;
//! use intake_core::PaymentGateway;
//!
//! // Create gateway from environment
//! let gateway = StripeGateway::from_env()?;
//!
//! // Open a checkout session
//! let session = gateway.create_session(&spec).await?;
//!
//! // Redirect the customer to session.url
//! ```
//!
//! ## Webhook Handling
//!
//! ```rust,ignore
//! let event = gateway.verify_event(&body, signature_header).await?;
//! ```

pub mod checkout;
pub mod config;
pub mod webhook;

// Re-exports
pub use checkout::StripeGateway;
pub use config::StripeConfig;
pub use webhook::{sign_payload, verify_signature};
