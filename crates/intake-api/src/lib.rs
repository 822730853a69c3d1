//! # intake-api
//!
//! HTTP API layer for craft-intake.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Checkout session and experience inquiry endpoints
//! - Stripe webhook handler
//! - Origin allow-list enforcement
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/` | Liveness text |
//! | GET | `/healthz` | Health check |
//! | POST | `/experience-inquiry` | House call / event inquiry |
//! | POST | `/create-checkout-session` | Order or deposit checkout |
//! | POST | `/webhook` | Stripe webhook |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
