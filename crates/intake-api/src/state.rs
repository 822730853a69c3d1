//! # Application State
//!
//! Shared state for the Axum application.
//! Holds the checkout builder, payment gateway, notifier and webhook dispatcher.

use intake_core::{
    BusinessSettings, CheckoutSessionBuilder, CheckoutUrls, Notifier, SharedGateway,
    SharedMailer, WebhookDispatcher,
};
use intake_smtp::{SmtpConfig, SmtpMailer};
use intake_stripe::StripeGateway;
use std::sync::Arc;

const DEFAULT_SETTINGS_PATH: &str = "config/intake.toml";

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Storefront origin; checkout return URLs and relative images hang off it
    pub frontend_url: String,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Origins allowed to call the API from a browser
    pub allowed_origins: Vec<String>,
    /// Business settings TOML
    pub settings_path: String,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let frontend_url = std::env::var("FRONTEND_URL")
            .unwrap_or_else(|_| "http://localhost:5173".to_string())
            .trim_end_matches('/')
            .to_string();

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .ok()
            .map(|list| parse_origins(&list))
            .filter(|origins| !origins.is_empty())
            .unwrap_or_else(|| vec![frontend_url.clone()]);

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(4242),
            frontend_url,
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            allowed_origins,
            settings_path: std::env::var("INTAKE_SETTINGS")
                .unwrap_or_else(|_| DEFAULT_SETTINGS_PATH.to_string()),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid socket address {}:{}: {}", self.host, self.port, e))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_allowed_origin(&self, origin: &str) -> bool {
        let origin = origin.trim_end_matches('/');
        self.allowed_origins.iter().any(|allowed| allowed == origin)
    }
}

fn parse_origins(list: &str) -> Vec<String> {
    list.split(',')
        .map(|o| o.trim().trim_end_matches('/'))
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// Business settings
    pub settings: Arc<BusinessSettings>,
    /// Validates checkout requests into session specs
    pub checkout: Arc<CheckoutSessionBuilder>,
    /// Payment provider
    pub gateway: SharedGateway,
    /// Transactional email
    pub notifier: Notifier,
    /// Webhook verification and routing
    pub webhooks: Arc<WebhookDispatcher>,
}

impl AppState {
    /// Wire the components together.
    ///
    /// The business inbox is `settings.inbox`, falling back to `from`.
    pub fn new(
        config: AppConfig,
        settings: BusinessSettings,
        gateway: SharedGateway,
        mailer: SharedMailer,
        from: impl Into<String>,
    ) -> Self {
        let from = from.into();
        let inbox = settings.inbox.clone().unwrap_or_else(|| from.clone());
        let urls = CheckoutUrls::new(&config.frontend_url).with_paths(&settings);
        let settings = Arc::new(settings);

        let notifier = Notifier::new(mailer, from, inbox, settings.clone());
        let checkout = Arc::new(CheckoutSessionBuilder::new(settings.as_ref().clone(), urls));
        let webhooks = Arc::new(WebhookDispatcher::new(gateway.clone(), notifier.clone()));

        Self {
            config,
            settings,
            checkout,
            gateway,
            notifier,
            webhooks,
        }
    }

    /// Build the production state: Stripe gateway, SMTP mailer, settings file
    pub fn from_env() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();
        let mut settings = load_settings(&config.settings_path)?;

        let gateway = StripeGateway::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe: {}", e))?;

        let smtp = SmtpConfig::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to load SMTP settings: {}", e))?;
        let mailer = SmtpMailer::new(&smtp)
            .map_err(|e| anyhow::anyhow!("Failed to initialize SMTP: {}", e))?;

        let inbox = std::env::var("BUSINESS_INBOX")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| settings.inbox.clone())
            .unwrap_or_else(|| smtp.username.clone());
        settings = settings.with_inbox(inbox);

        Ok(Self::new(
            config,
            settings,
            Arc::new(gateway),
            Arc::new(mailer),
            smtp.from,
        ))
    }
}

/// Load business settings from the TOML file at `path`
fn load_settings(path: &str) -> anyhow::Result<BusinessSettings> {
    let candidates = [
        path.to_string(),
        format!("../{path}"),
        format!("../../{path}"),
    ];

    for candidate in &candidates {
        if let Ok(content) = std::fs::read_to_string(candidate) {
            let settings = BusinessSettings::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", candidate, e))?;
            tracing::info!("Loaded business settings from {}", candidate);
            return Ok(settings);
        }
    }

    tracing::warn!("No settings file at {}, using defaults", path);
    Ok(BusinessSettings::default())
}
