//! # intake-smtp
//!
//! SMTP delivery for craft-intake. `SmtpMailer` implements
//! `intake_core::Mailer` with lettre over an authenticated relay
//! (implicit TLS on port 465, STARTTLS otherwise).
//!
//! ```rust,ignore
//! use intake_smtp::{SmtpConfig, SmtpMailer};
//!
//! let config = SmtpConfig::from_env()?;
//! let mailer = SmtpMailer::new(&config)?;
//! ```

pub mod config;
pub mod mailer;

pub use config::SmtpConfig;
pub use mailer::SmtpMailer;
