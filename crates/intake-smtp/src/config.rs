//! # SMTP Configuration
//!
//! Relay settings loaded from environment variables. The password is held as
//! a `SecretString` so it never shows up in `Debug` output.

use intake_core::IntakeError;
use secrecy::SecretString;
use std::env;

const DEFAULT_HOST: &str = "smtp.gmail.com";
const DEFAULT_PORT: u16 = 465;

/// Port on which the relay speaks implicit TLS
pub const IMPLICIT_TLS_PORT: u16 = 465;

/// SMTP relay configuration
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    /// Sender address; defaults to the relay username
    pub from: String,
}

impl SmtpConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `SMTP_USER`
    /// - `SMTP_PASS`
    ///
    /// Optional: `SMTP_HOST` (smtp.gmail.com), `SMTP_PORT` (465), `MAIL_FROM`
    pub fn from_env() -> Result<Self, IntakeError> {
        dotenvy::dotenv().ok();

        let username = env::var("SMTP_USER")
            .map_err(|_| IntakeError::Configuration("SMTP_USER not set".to_string()))?;
        let password = env::var("SMTP_PASS")
            .map_err(|_| IntakeError::Configuration("SMTP_PASS not set".to_string()))?;

        let mut config = Self::new(username, password);

        if let Ok(host) = env::var("SMTP_HOST") {
            config.host = host;
        }
        if let Ok(port) = env::var("SMTP_PORT") {
            config.port = port.parse().map_err(|_| {
                IntakeError::Configuration(format!("SMTP_PORT is not a port number: {port}"))
            })?;
        }
        if let Some(from) = env::var("MAIL_FROM").ok().filter(|v| !v.trim().is_empty()) {
            config.from = from;
        }

        config.validate()?;
        Ok(config)
    }

    /// Create config with explicit credentials and default relay
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        let username = username.into();
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            from: username.clone(),
            username,
            password: SecretString::from(password.into()),
        }
    }

    pub fn with_relay(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    pub fn validate(&self) -> Result<(), IntakeError> {
        if self.username.trim().is_empty() {
            return Err(IntakeError::Configuration("SMTP_USER is empty".to_string()));
        }
        if self.host.trim().is_empty() {
            return Err(IntakeError::Configuration("SMTP_HOST is empty".to_string()));
        }
        Ok(())
    }

    /// Implicit TLS on 465, STARTTLS upgrade elsewhere
    pub fn implicit_tls(&self) -> bool {
        self.port == IMPLICIT_TLS_PORT
    }
}
