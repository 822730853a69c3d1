//! # Business Settings
//!
//! Shop-level knobs for craft-intake: pricing constants, shipping setup and
//! where notices go. Loaded from `config/intake.toml`; every field has a
//! default so a missing file is not an error.

use serde::{Deserialize, Serialize};

/// Business configuration shared by the checkout and notification flows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessSettings {
    /// Display name used in email subjects and sign-offs
    pub business_name: String,

    /// Inbox receiving internal notices (falls back to the SMTP user)
    pub inbox: Option<String>,

    /// ISO 4217 currency code, lowercase (Stripe convention)
    pub currency: String,

    /// Experience deposit per guest, in minor units
    pub deposit_per_guest_cents: i64,

    /// Flat travel fee quoted for house calls, in minor units
    pub house_travel_fee_cents: i64,

    /// Stripe shipping rate attached to shipped orders (`shr_...`)
    pub shipping_rate_id: String,

    /// Countries accepted for shipping address collection
    pub shipping_countries: Vec<String>,

    /// Frontend path Stripe redirects to after payment
    pub success_path: String,

    /// Frontend path Stripe redirects to when the customer backs out
    pub cancel_path: String,
}

impl Default for BusinessSettings {
    fn default() -> Self {
        Self {
            business_name: "Handmade Studio".to_string(),
            inbox: None,
            currency: "usd".to_string(),
            deposit_per_guest_cents: 2500,
            house_travel_fee_cents: 2500,
            shipping_rate_id: String::new(),
            shipping_countries: vec!["US".to_string()],
            success_path: "/success".to_string(),
            cancel_path: "/cart".to_string(),
        }
    }
}

impl BusinessSettings {
    /// Load settings from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Builder: set the internal inbox
    pub fn with_inbox(mut self, inbox: impl Into<String>) -> Self {
        self.inbox = Some(inbox.into());
        self
    }

    /// Builder: set the shipping rate
    pub fn with_shipping_rate(mut self, rate_id: impl Into<String>) -> Self {
        self.shipping_rate_id = rate_id.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = BusinessSettings::default();
        assert_eq!(settings.deposit_per_guest_cents, 2500);
        assert_eq!(settings.shipping_countries, vec!["US"]);
        assert!(settings.inbox.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = BusinessSettings::from_toml(
            r#"
            business_name = "Clay & Co"
            inbox = "studio@clayco.com"
            shipping_rate_id = "shr_123"
            "#,
        )
        .unwrap();

        assert_eq!(settings.business_name, "Clay & Co");
        assert_eq!(settings.inbox.as_deref(), Some("studio@clayco.com"));
        assert_eq!(settings.shipping_rate_id, "shr_123");
        assert_eq!(settings.currency, "usd");
        assert_eq!(settings.deposit_per_guest_cents, 2500);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(BusinessSettings::from_toml("deposit_per_guest_cents = \"lots\"").is_err());
    }
}
