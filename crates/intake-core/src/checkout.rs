//! # Checkout Sessions
//!
//! Turns a storefront checkout request (a cart order or an experience
//! deposit) into the session description handed to the payment gateway.
//!
//! ```text
//! CheckoutRequest ──► CheckoutSessionBuilder::build ──► CheckoutSessionSpec
//!                        │                                  │
//!                        ├─ email shape                     ├─ line_items
//!                        ├─ deposit guests in [2,5]         ├─ metadata
//!                        └─ cart price resolution           └─ shipping?
//! ```

use crate::error::{IntakeError, IntakeResult};
use crate::settings::BusinessSettings;
use crate::validate::{integer_value, is_valid_email, non_blank};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Deposit bookings accept this many guests
pub const DEPOSIT_GUESTS: std::ops::RangeInclusive<i64> = 2..=5;

/// Largest unit amount Stripe accepts, in minor units
pub const MAX_UNIT_AMOUNT: i64 = 99_999_999;

/// Largest quantity accepted on a cart line
pub const MAX_QUANTITY: u32 = 999;

/// Stripe rejects metadata values longer than this
pub const METADATA_VALUE_LIMIT: usize = 500;

const RESERVED_METADATA_KEYS: [&str; 3] = ["intent", "optedIn", "fulfillment"];

// =============================================================================
// Request Types
// =============================================================================

/// What the customer is paying for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckoutIntent {
    /// Cart of handmade goods
    #[default]
    Order,
    /// Deposit holding an experience booking
    Deposit,
}

impl CheckoutIntent {
    /// `deposit` on exact match, otherwise `order`
    pub fn from_label(label: Option<&str>) -> Self {
        match label {
            Some("deposit") => CheckoutIntent::Deposit,
            _ => CheckoutIntent::Order,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutIntent::Order => "order",
            CheckoutIntent::Deposit => "deposit",
        }
    }
}

impl fmt::Display for CheckoutIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an order reaches the customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fulfillment {
    Shipping,
    /// Pickup or hand delivery
    #[default]
    InPerson,
}

impl Fulfillment {
    /// `shipping` on exact match, otherwise `in_person`
    pub fn from_label(label: Option<&str>) -> Self {
        match label {
            Some("shipping") => Fulfillment::Shipping,
            _ => Fulfillment::InPerson,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Fulfillment::Shipping => "shipping",
            Fulfillment::InPerson => "in_person",
        }
    }
}

/// A cart line as posted by the storefront
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CartItem {
    #[serde(default)]
    pub title: Option<String>,

    /// Display price, e.g. `"$45.00+"`
    #[serde(default)]
    pub price: Option<Value>,

    /// Price in minor units; wins over `price` when numeric
    #[serde(default, rename = "priceCents")]
    pub price_cents: Option<Value>,

    #[serde(default)]
    pub quantity: Option<Value>,

    /// Customization notes (color, engraving, ...)
    #[serde(default)]
    pub notes: Option<String>,

    /// Image path or URL
    #[serde(default)]
    pub thumbnail: Option<String>,
}

impl CartItem {
    /// Resolve the unit price in minor units.
    ///
    /// A numeric `priceCents` is used unchanged. Otherwise the display price
    /// is stripped down to digits and `.`, then scaled by 100 and rounded.
    /// The result must lie in `0..=MAX_UNIT_AMOUNT`.
    pub fn unit_amount(&self) -> IntakeResult<i64> {
        let cents = match self.price_cents.as_ref().and_then(numeric_cents) {
            Some(cents) => Some(cents),
            None => self.price.as_ref().and_then(display_price_cents),
        };

        cents
            .filter(|c| (0..=MAX_UNIT_AMOUNT).contains(c))
            .ok_or_else(|| {
                IntakeError::validation(format!("Invalid price for {}", self.display_title()))
            })
    }

    /// Quantity, defaulting to 1 when absent or below 1.
    ///
    /// More than `MAX_QUANTITY` is rejected.
    pub fn quantity(&self) -> IntakeResult<u32> {
        let quantity = self
            .quantity
            .as_ref()
            .and_then(integer_value)
            .unwrap_or(1)
            .max(1);

        u32::try_from(quantity)
            .ok()
            .filter(|q| *q <= MAX_QUANTITY)
            .ok_or_else(|| {
                IntakeError::validation(format!(
                    "Quantity for {} cannot exceed {}",
                    self.display_title(),
                    MAX_QUANTITY
                ))
            })
    }

    fn display_title(&self) -> String {
        non_blank(self.title.as_deref()).unwrap_or_else(|| "Item".to_string())
    }
}

fn numeric_cents(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(whole_cents)),
        _ => None,
    }
}

fn display_price_cents(value: &Value) -> Option<i64> {
    let dollars = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            cleaned.parse::<f64>().ok()?
        }
        _ => return None,
    };

    whole_cents(dollars * 100.0)
}

/// Round to whole cents. Out-of-range values saturate and are rejected by
/// the `unit_amount` range check.
fn whole_cents(value: f64) -> Option<i64> {
    value.is_finite().then(|| value.round() as i64)
}

/// Checkout request body from the storefront
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub items: Vec<CartItem>,

    /// Marketing opt-in checkbox
    #[serde(default, rename = "optedIn")]
    pub opted_in: bool,

    #[serde(default)]
    pub customer_email: String,

    /// `order` or `deposit`
    #[serde(default)]
    pub intent: Option<String>,

    /// Free-form booking details (guestCount, date, location, ...)
    #[serde(default)]
    pub meta: Map<String, Value>,

    /// `shipping` or `in_person`
    #[serde(default)]
    pub fulfillment: Option<String>,
}

impl CheckoutRequest {
    pub fn intent(&self) -> CheckoutIntent {
        CheckoutIntent::from_label(self.intent.as_deref())
    }

    pub fn fulfillment(&self) -> Fulfillment {
        Fulfillment::from_label(self.fulfillment.as_deref())
    }

    /// Guest count for a deposit; must be a whole number in [2,5]
    pub fn deposit_guests(&self) -> IntakeResult<i64> {
        self.meta
            .get("guestCount")
            .and_then(integer_value)
            .filter(|n| DEPOSIT_GUESTS.contains(n))
            .ok_or_else(|| IntakeError::validation("Guest count must be between 2 and 5"))
    }
}

// =============================================================================
// Session Types
// =============================================================================

/// A priced line on the provider's checkout page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItem {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Unit price in minor units
    pub unit_amount: i64,

    pub quantity: u32,

    pub currency: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

impl LineItem {
    /// Total for this line in minor units
    pub fn total(&self) -> i64 {
        self.unit_amount.saturating_mul(i64::from(self.quantity))
    }
}

/// Checkout mode. Only one-time payments are sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutMode {
    #[default]
    Payment,
}

impl CheckoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutMode::Payment => "payment",
        }
    }
}

/// Shipping setup for shipped orders
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShippingOptions {
    /// Provider shipping rate id
    pub shipping_rate: String,
    /// Countries allowed for address collection
    pub allowed_countries: Vec<String>,
}

/// Everything the gateway needs to open a checkout session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutSessionSpec {
    pub line_items: Vec<LineItem>,
    pub mode: CheckoutMode,
    pub success_url: String,
    pub cancel_url: String,
    pub customer_email: String,
    pub metadata: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping: Option<ShippingOptions>,
    /// Sent as the provider idempotency key
    pub idempotency_key: String,
}

impl CheckoutSessionSpec {
    /// Session total in minor units (before shipping)
    pub fn total(&self) -> i64 {
        self.line_items
            .iter()
            .map(LineItem::total)
            .fold(0, i64::saturating_add)
    }

    pub fn intent(&self) -> CheckoutIntent {
        CheckoutIntent::from_label(self.metadata.get("intent").map(String::as_str))
    }
}

/// A session opened by the payment provider
#[derive(Debug, Clone, Serialize)]
pub struct CreatedSession {
    /// Provider session id
    pub session_id: String,
    /// Hosted checkout page to redirect the customer to
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Builder
// =============================================================================

/// Frontend redirect targets
#[derive(Debug, Clone)]
pub struct CheckoutUrls {
    /// Base URL of the storefront (e.g., "https://shop.example.com")
    pub base_url: String,
    /// Success page path
    pub success_path: String,
    /// Cancel page path
    pub cancel_path: String,
}

impl CheckoutUrls {
    pub fn new(base_url: impl Into<String>) -> Self {
        let defaults = BusinessSettings::default();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            success_path: defaults.success_path,
            cancel_path: defaults.cancel_path,
        }
    }

    /// Builder: take page paths from the business settings
    pub fn with_paths(mut self, settings: &BusinessSettings) -> Self {
        self.success_path = settings.success_path.clone();
        self.cancel_path = settings.cancel_path.clone();
        self
    }

    /// Success URL with the provider's session id placeholder
    pub fn success_url(&self) -> String {
        format!(
            "{}{}?session_id={{CHECKOUT_SESSION_ID}}",
            self.base_url, self.success_path
        )
    }

    pub fn cancel_url(&self) -> String {
        format!("{}{}", self.base_url, self.cancel_path)
    }

    /// Absolute http(s) URL for a storefront asset, if it can be made one
    pub fn asset_url(&self, path: &str) -> Option<String> {
        let path = path.trim();
        if path.is_empty() {
            return None;
        }
        if path.starts_with("https://") || path.starts_with("http://") {
            return Some(path.to_string());
        }
        if path.contains("://") || path.starts_with("data:") {
            return None;
        }
        Some(format!("{}/{}", self.base_url, path.trim_start_matches('/')))
    }
}

/// Validates checkout requests and builds session specs
#[derive(Debug, Clone)]
pub struct CheckoutSessionBuilder {
    settings: BusinessSettings,
    urls: CheckoutUrls,
}

impl CheckoutSessionBuilder {
    pub fn new(settings: BusinessSettings, urls: CheckoutUrls) -> Self {
        Self { settings, urls }
    }

    /// Validate `request` and describe the session to open.
    pub fn build(&self, request: &CheckoutRequest) -> IntakeResult<CheckoutSessionSpec> {
        let customer_email = request.customer_email.trim();
        if !is_valid_email(customer_email) {
            return Err(IntakeError::validation("A valid email address is required"));
        }

        let intent = request.intent();
        let fulfillment = request.fulfillment();

        let line_items = match intent {
            CheckoutIntent::Deposit => vec![self.deposit_line_item(request)?],
            CheckoutIntent::Order => self.order_line_items(request)?,
        };

        let shipping = match (intent, fulfillment) {
            (CheckoutIntent::Order, Fulfillment::Shipping) => Some(self.shipping_options()?),
            _ => None,
        };

        Ok(CheckoutSessionSpec {
            line_items,
            mode: CheckoutMode::Payment,
            success_url: self.urls.success_url(),
            cancel_url: self.urls.cancel_url(),
            customer_email: customer_email.to_string(),
            metadata: build_metadata(intent, request.opted_in, fulfillment, &request.meta),
            shipping,
            idempotency_key: Uuid::new_v4().to_string(),
        })
    }

    fn deposit_line_item(&self, request: &CheckoutRequest) -> IntakeResult<LineItem> {
        let guests = request.deposit_guests()?;

        let details: Vec<String> = ["date", "startTime", "location"]
            .iter()
            .filter_map(|key| request.meta.get(*key).and_then(Value::as_str))
            .filter_map(|v| non_blank(Some(v)))
            .collect();
        let mut description = format!("{guests} guests");
        if !details.is_empty() {
            description = format!("{description} · {}", details.join(" · "));
        }

        Ok(LineItem {
            name: "Experience deposit".to_string(),
            description: Some(description),
            unit_amount: self.settings.deposit_per_guest_cents * guests,
            quantity: 1,
            currency: self.settings.currency.clone(),
            images: Vec::new(),
        })
    }

    fn order_line_items(&self, request: &CheckoutRequest) -> IntakeResult<Vec<LineItem>> {
        if request.items.is_empty() {
            return Err(IntakeError::validation("Your cart is empty"));
        }

        request
            .items
            .iter()
            .map(|item| -> IntakeResult<LineItem> {
                Ok(LineItem {
                    name: item.display_title(),
                    description: non_blank(item.notes.as_deref()),
                    unit_amount: item.unit_amount()?,
                    quantity: item.quantity()?,
                    currency: self.settings.currency.clone(),
                    images: item
                        .thumbnail
                        .as_deref()
                        .and_then(|t| self.urls.asset_url(t))
                        .into_iter()
                        .collect(),
                })
            })
            .collect()
    }

    fn shipping_options(&self) -> IntakeResult<ShippingOptions> {
        if self.settings.shipping_rate_id.is_empty() {
            return Err(IntakeError::Configuration(
                "shipping_rate_id is not configured".to_string(),
            ));
        }
        Ok(ShippingOptions {
            shipping_rate: self.settings.shipping_rate_id.clone(),
            allowed_countries: self.settings.shipping_countries.clone(),
        })
    }
}

fn build_metadata(
    intent: CheckoutIntent,
    opted_in: bool,
    fulfillment: Fulfillment,
    meta: &Map<String, Value>,
) -> BTreeMap<String, String> {
    let mut metadata: BTreeMap<String, String> = meta
        .iter()
        .filter(|(key, _)| !RESERVED_METADATA_KEYS.contains(&key.as_str()))
        .filter_map(|(key, value)| {
            let value = match value {
                Value::Null => return None,
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Some((key.clone(), truncate(value, METADATA_VALUE_LIMIT)))
        })
        .collect();

    metadata.insert("intent".to_string(), intent.as_str().to_string());
    metadata.insert("optedIn".to_string(), opted_in.to_string());
    metadata.insert("fulfillment".to_string(), fulfillment.as_str().to_string());
    metadata
}

fn truncate(value: String, limit: usize) -> String {
    if value.chars().count() <= limit {
        value
    } else {
        value.chars().take(limit).collect()
    }
}
