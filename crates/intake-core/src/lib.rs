//! # intake-core
//!
//! Core types, validation and capability traits for the craft-intake order
//! backend.
//!
//! This crate provides:
//! - `CheckoutSessionBuilder` turning storefront orders and experience
//!   deposits into a `CheckoutSessionSpec`
//! - `InquiryRequest` validation and inquiry email composition
//! - `WebhookDispatcher` routing verified payment events to confirmation mail
//! - `PaymentGateway` and `Mailer` capability traits
//! - `Notifier` and `SideTask` for the two email delivery policies
//! - `IntakeError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use intake_core::{BusinessSettings, CheckoutRequest, CheckoutSessionBuilder, CheckoutUrls};
//!
//! let builder = CheckoutSessionBuilder::new(
//!     BusinessSettings::default(),
//!     CheckoutUrls::new("https://shop.example.com"),
//! );
//!
//! let spec = builder.build(&request)?;
//! let session = gateway.create_session(&spec).await?;
//!
//! // Redirect the customer to session.url
//! ```

pub mod checkout;
pub mod error;
pub mod event;
pub mod gateway;
pub mod inquiry;
pub mod mail;
pub mod settings;
pub mod task;
pub mod validate;
pub mod webhook;

// Re-exports for convenience
pub use checkout::{
    CartItem, CheckoutIntent, CheckoutMode, CheckoutRequest, CheckoutSessionBuilder,
    CheckoutSessionSpec, CheckoutUrls, CreatedSession, Fulfillment, LineItem, ShippingOptions,
};
pub use error::{IntakeError, IntakeResult};
pub use event::{CompletedCheckout, PaymentEvent, PaymentEventType};
pub use gateway::{PaymentGateway, SharedGateway};
pub use inquiry::{Inquiry, InquiryKind, InquiryRequest};
pub use mail::{Composed, EmailMessage, Mailer, Notifier, SharedMailer};
pub use settings::BusinessSettings;
pub use task::SideTask;
pub use validate::is_valid_email;
pub use webhook::{ProcessedEvents, WebhookDispatcher, WebhookOutcome};
