//! # craft-intake
//!
//! Order intake backend for a handmade-goods studio.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export STRIPE_SECRET_KEY=sk_test_...
//! export STRIPE_WEBHOOK_SECRET=whsec_...
//! export SMTP_USER=studio@example.com
//! export SMTP_PASS=...
//! export FRONTEND_URL=https://shop.example.com
//!
//! # Run the server
//! craft-intake
//! ```

use intake_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    print_banner();

    let state = AppState::from_env()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Business: {}", state.settings.business_name);
    info!("Payment provider: {}", state.gateway.provider_name());
    info!("Notices go to: {}", state.notifier.inbox());
    info!("Allowed origins: {:?}", state.config.allowed_origins);

    let app = routes::create_router(state);

    info!("craft-intake starting on http://{}", addr);

    if !is_prod {
        info!("Health: GET http://{}/healthz", addr);
        info!("Checkout: POST http://{}/create-checkout-session", addr);
        info!("Inquiry: POST http://{}/experience-inquiry", addr);
        info!("Webhook: POST http://{}/webhook", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("craft-intake stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

fn print_banner() {
    println!(
        r#"
  craft-intake
  ━━━━━━━━━━━━━━━━━━━━━━━
  Orders, deposits and inquiries
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
