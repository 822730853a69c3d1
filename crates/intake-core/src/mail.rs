//! # Email Notifier
//!
//! Plain-text transactional email on top of the `Mailer` capability.
//!
//! Two delivery policies live here:
//! - inquiry mail is awaited and failures reach the caller;
//! - confirmation mail from webhooks runs as a [`crate::task::SideTask`] and
//!   failures are only logged.

use crate::checkout::{CheckoutIntent, Fulfillment};
use crate::error::IntakeResult;
use crate::event::CompletedCheckout;
use crate::inquiry::Inquiry;
use crate::settings::BusinessSettings;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Placeholder for missing values in email bodies
pub const MISSING: &str = "—";

/// An outgoing plain-text message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub from: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub body: String,
}

/// Subject and body, before addressing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composed {
    pub subject: String,
    pub body: String,
}

/// Capability interface over the mail relay
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one message. Relay failures surface as `IntakeError::Upstream`.
    async fn send(&self, message: &EmailMessage) -> IntakeResult<()>;
}

pub type SharedMailer = Arc<dyn Mailer>;

/// Format minor units as dollars with two decimals
pub fn format_amount(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}${}.{:02}", abs / 100, abs % 100)
}

/// Order confirmation text
pub fn order_confirmation(checkout: &CompletedCheckout, settings: &BusinessSettings) -> Composed {
    let fulfillment = Fulfillment::from_label(checkout.meta("fulfillment"));
    let next_step = match fulfillment {
        Fulfillment::Shipping => "We'll email tracking details as soon as your order ships.",
        Fulfillment::InPerson => "We'll reach out to arrange pickup or delivery.",
    };

    Composed {
        subject: format!("Your {} order is confirmed", settings.business_name),
        body: format!(
            "Thank you for your order!\n\n\
             Order: {}\n\
             Email: {}\n\
             Total: {}\n\n\
             {}\n\n\
             {}\n",
            checkout.session_id,
            checkout.customer_email.as_deref().unwrap_or(MISSING),
            checkout
                .amount_total
                .map(format_amount)
                .unwrap_or_else(|| MISSING.to_string()),
            next_step,
            settings.business_name,
        ),
    }
}

/// Deposit confirmation text
pub fn deposit_confirmation(
    checkout: &CompletedCheckout,
    settings: &BusinessSettings,
) -> Composed {
    let field = |key: &str| checkout.meta(key).unwrap_or(MISSING);

    Composed {
        subject: format!("Your {} experience deposit is confirmed", settings.business_name),
        body: format!(
            "Thank you! Your deposit is confirmed.\n\n\
             Guests: {}\n\
             Date: {}\n\
             Time: {}\n\
             Location: {}\n\
             Deposit: {}\n\
             Reference: {}\n\n\
             We'll follow up to finalize the details.\n\n\
             {}\n",
            field("guestCount"),
            field("date"),
            field("startTime"),
            field("location"),
            checkout
                .amount_total
                .map(format_amount)
                .unwrap_or_else(|| MISSING.to_string()),
            checkout.session_id,
            settings.business_name,
        ),
    }
}

/// Sends the business's transactional email
#[derive(Clone)]
pub struct Notifier {
    mailer: SharedMailer,
    from: String,
    inbox: String,
    settings: Arc<BusinessSettings>,
}

impl Notifier {
    pub fn new(
        mailer: SharedMailer,
        from: impl Into<String>,
        inbox: impl Into<String>,
        settings: Arc<BusinessSettings>,
    ) -> Self {
        Self {
            mailer,
            from: from.into(),
            inbox: inbox.into(),
            settings,
        }
    }

    pub fn inbox(&self) -> &str {
        &self.inbox
    }

    fn address(&self, to: &str, composed: Composed) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            from: self.from.clone(),
            reply_to: None,
            subject: composed.subject,
            body: composed.body,
        }
    }

    /// Internal notice to the inbox, then an acknowledgment to the requester.
    ///
    /// Both sends are attempted; the first failure is returned.
    #[instrument(skip(self, inquiry), fields(kind = ?inquiry.kind))]
    pub async fn send_inquiry(&self, inquiry: &Inquiry) -> IntakeResult<()> {
        let mut notice = self.address(&self.inbox, inquiry.internal_notice(&self.settings));
        notice.reply_to = Some(inquiry.email.clone());
        let notice_result = self.mailer.send(&notice).await;

        let ack = self.address(&inquiry.email, inquiry.acknowledgment(&self.settings));
        let ack_result = self.mailer.send(&ack).await;

        notice_result?;
        ack_result?;
        info!("Inquiry emails sent");
        Ok(())
    }

    /// Confirmation for a completed checkout, picked by intent
    pub async fn send_confirmation(&self, checkout: &CompletedCheckout) -> IntakeResult<()> {
        match checkout.intent() {
            CheckoutIntent::Deposit => self.send_deposit_confirmation(checkout).await,
            CheckoutIntent::Order => self.send_order_confirmation(checkout).await,
        }
    }

    #[instrument(skip(self, checkout), fields(session_id = %checkout.session_id))]
    pub async fn send_order_confirmation(&self, checkout: &CompletedCheckout) -> IntakeResult<()> {
        let message = self.address(
            self.confirmation_recipient(checkout),
            order_confirmation(checkout, &self.settings),
        );
        self.mailer.send(&message).await?;
        info!(to = %message.to, "Order confirmation sent");
        Ok(())
    }

    #[instrument(skip(self, checkout), fields(session_id = %checkout.session_id))]
    pub async fn send_deposit_confirmation(
        &self,
        checkout: &CompletedCheckout,
    ) -> IntakeResult<()> {
        let message = self.address(
            self.confirmation_recipient(checkout),
            deposit_confirmation(checkout, &self.settings),
        );
        self.mailer.send(&message).await?;
        info!(to = %message.to, "Deposit confirmation sent");
        Ok(())
    }

    fn confirmation_recipient<'a>(&'a self, checkout: &'a CompletedCheckout) -> &'a str {
        match checkout.customer_email.as_deref() {
            Some(email) => email,
            None => {
                warn!(
                    session_id = %checkout.session_id,
                    "Checkout has no customer email, sending confirmation to inbox"
                );
                &self.inbox
            }
        }
    }
}
