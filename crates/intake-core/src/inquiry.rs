//! # Experience Inquiries
//!
//! Validation and message composition for house-call and event inquiries.
//! Sending happens in [`crate::mail::Notifier::send_inquiry`].

use crate::error::{IntakeError, IntakeResult};
use crate::mail::{format_amount, Composed, MISSING};
use crate::settings::BusinessSettings;
use crate::validate::{integer_value, is_valid_email, non_blank};
use serde::Deserialize;
use serde_json::Value;
use std::ops::RangeInclusive;

/// Kind of experience being requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InquiryKind {
    /// We come to the customer's home
    #[default]
    House,
    /// Hosted event
    Event,
}

impl InquiryKind {
    /// `event` on exact match, otherwise `house`
    pub fn from_label(label: Option<&str>) -> Self {
        match label {
            Some("event") => InquiryKind::Event,
            _ => InquiryKind::House,
        }
    }

    /// Allowed guest counts for this kind
    pub fn guest_range(&self) -> RangeInclusive<i64> {
        match self {
            InquiryKind::House => 1..=2,
            InquiryKind::Event => 2..=5,
        }
    }

    /// Clamp a raw guest count into range; missing or unparseable values
    /// become the lower bound.
    pub fn clamp_guests(&self, raw: Option<&Value>) -> i64 {
        let range = self.guest_range();
        raw.and_then(integer_value)
            .map(|n| n.clamp(*range.start(), *range.end()))
            .unwrap_or(*range.start())
    }

    pub fn label(&self) -> &'static str {
        match self {
            InquiryKind::House => "House call",
            InquiryKind::Event => "Event",
        }
    }
}

/// Inquiry form body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InquiryRequest {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub guest_count: Option<Value>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl InquiryRequest {
    /// Normalize and check required fields
    pub fn validate(&self) -> IntakeResult<Inquiry> {
        let kind = InquiryKind::from_label(self.kind.as_deref());
        let guests = kind.clamp_guests(self.guest_count.as_ref());

        let name = non_blank(self.name.as_deref());
        let email = non_blank(self.email.as_deref());
        let date = non_blank(self.date.as_deref());
        let location = non_blank(self.location.as_deref());
        let start_time = non_blank(self.start_time.as_deref());

        let (Some(name), Some(email), Some(date), Some(location)) = (name, email, date, location)
        else {
            return Err(IntakeError::validation(
                "Name, email, date and location are required",
            ));
        };
        if !is_valid_email(&email) {
            return Err(IntakeError::validation("A valid email address is required"));
        }
        if kind == InquiryKind::Event && start_time.is_none() {
            return Err(IntakeError::validation("A start time is required for events"));
        }

        Ok(Inquiry {
            kind,
            name,
            email,
            phone: non_blank(self.phone.as_deref()),
            date,
            start_time,
            guests,
            location,
            notes: non_blank(self.notes.as_deref()),
        })
    }
}

/// A validated inquiry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inquiry {
    pub kind: InquiryKind,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub date: String,
    pub start_time: Option<String>,
    pub guests: i64,
    pub location: String,
    pub notes: Option<String>,
}

impl Inquiry {
    /// Roughly one hour per guest
    pub fn estimated_hours(&self) -> i64 {
        self.guests
    }

    fn when(&self) -> String {
        match &self.start_time {
            Some(time) => format!("{} at {}", self.date, time),
            None => self.date.clone(),
        }
    }

    fn travel_note(&self, settings: &BusinessSettings) -> String {
        match self.kind {
            InquiryKind::House => format!(
                "Flat {} travel fee applies to house calls.",
                format_amount(settings.house_travel_fee_cents)
            ),
            InquiryKind::Event => {
                "A travel fee may apply depending on the event location.".to_string()
            }
        }
    }

    /// Notice for the business inbox
    pub fn internal_notice(&self, settings: &BusinessSettings) -> Composed {
        let hours = self.estimated_hours();
        let subject = format!(
            "New {} inquiry: {} ({})",
            self.kind.label().to_lowercase(),
            self.name,
            self.when()
        );

        let body = format!(
            "Type: {}\n\
             Name: {}\n\
             Email: {}\n\
             Phone: {}\n\
             Date: {}\n\
             Guests: {}\n\
             Location: {}\n\
             Estimated duration: ~{} hour{}\n\
             Travel: {}\n\
             \n\
             Notes:\n{}\n",
            self.kind.label(),
            self.name,
            self.email,
            self.phone.as_deref().unwrap_or(MISSING),
            self.when(),
            self.guests,
            self.location,
            hours,
            if hours == 1 { "" } else { "s" },
            self.travel_note(settings),
            self.notes.as_deref().unwrap_or(MISSING),
        );

        Composed { subject, body }
    }

    /// Short acknowledgment for the requester
    pub fn acknowledgment(&self, settings: &BusinessSettings) -> Composed {
        let subject = format!("We received your inquiry - {}", settings.business_name);
        let body = format!(
            "Hi {},\n\n\
             Thanks for reaching out! We received your {} request for {} \
             ({} guest{}) in {}.\n\n\
             {}\n\n\
             We'll be in touch shortly to confirm the details.\n\n\
             {}\n",
            self.name,
            self.kind.label().to_lowercase(),
            self.when(),
            self.guests,
            if self.guests == 1 { "" } else { "s" },
            self.location,
            self.travel_note(settings),
            settings.business_name,
        );

        Composed { subject, body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: Value) -> InquiryRequest {
        serde_json::from_value(body).unwrap()
    }

    fn house() -> Value {
        json!({
            "type": "house",
            "name": "Robin",
            "email": "robin@example.com",
            "date": "2026-11-14",
            "location": "Portland",
            "guestCount": 2
        })
    }

    #[test]
    fn test_kind_normalization() {
        assert_eq!(InquiryKind::from_label(Some("event")), InquiryKind::Event);
        assert_eq!(InquiryKind::from_label(Some("Event")), InquiryKind::House);
        assert_eq!(InquiryKind::from_label(Some("party")), InquiryKind::House);
        assert_eq!(InquiryKind::from_label(None), InquiryKind::House);
    }

    #[test]
    fn test_guest_clamping() {
        let high = json!(99);
        assert_eq!(InquiryKind::House.clamp_guests(Some(&high)), 2);
        assert_eq!(InquiryKind::Event.clamp_guests(Some(&high)), 5);

        let low = json!(-3);
        assert_eq!(InquiryKind::House.clamp_guests(Some(&low)), 1);
        assert_eq!(InquiryKind::Event.clamp_guests(Some(&low)), 2);

        assert_eq!(InquiryKind::House.clamp_guests(None), 1);
        assert_eq!(InquiryKind::Event.clamp_guests(Some(&json!("abc"))), 2);
        assert_eq!(InquiryKind::Event.clamp_guests(Some(&json!("4"))), 4);
    }

    #[test]
    fn test_valid_house_inquiry() {
        let inquiry = request(house()).validate().unwrap();
        assert_eq!(inquiry.kind, InquiryKind::House);
        assert_eq!(inquiry.guests, 2);
        assert!(inquiry.start_time.is_none());
    }

    #[test]
    fn test_missing_required_fields() {
        for field in ["name", "email", "date", "location"] {
            let mut body = house();
            body[field] = json!("   ");
            let err = request(body).validate().unwrap_err();
            assert_eq!(err.status_code(), 400, "blank {field} should fail");
        }
    }

    #[test]
    fn test_invalid_email() {
        let mut body = house();
        body["email"] = json!("robin.example.com");
        assert!(request(body).validate().is_err());
    }

    #[test]
    fn test_event_requires_start_time() {
        let mut body = house();
        body["type"] = json!("event");
        assert!(request(body.clone()).validate().is_err());

        body["startTime"] = json!("18:30");
        body["guestCount"] = json!(99);
        let inquiry = request(body).validate().unwrap();
        assert_eq!(inquiry.kind, InquiryKind::Event);
        assert_eq!(inquiry.guests, 5);
    }

    #[test]
    fn test_internal_notice_contents() {
        let mut body = house();
        body["notes"] = json!("Gluten free please");
        let inquiry = request(body).validate().unwrap();
        let notice = inquiry.internal_notice(&BusinessSettings::default());

        assert_eq!(notice.subject, "New house call inquiry: Robin (2026-11-14)");
        assert!(notice.body.contains("Guests: 2"));
        assert!(notice.body.contains("Estimated duration: ~2 hours"));
        assert!(notice.body.contains("Flat $25.00 travel fee"));
        assert!(notice.body.contains("Phone: —"));
        assert!(notice.body.contains("Gluten free please"));
    }

    #[test]
    fn test_event_notice_travel_note() {
        let mut body = house();
        body["type"] = json!("event");
        body["startTime"] = json!("18:30");
        body["guestCount"] = json!(3);
        let inquiry = request(body).validate().unwrap();
        let notice = inquiry.internal_notice(&BusinessSettings::default());

        assert!(notice.subject.contains("2026-11-14 at 18:30"));
        assert!(notice.body.contains("may apply depending on the event location"));
        assert!(notice.body.contains("~3 hours"));
    }

    #[test]
    fn test_acknowledgment() {
        let inquiry = request(house()).validate().unwrap();
        let ack = inquiry.acknowledgment(&BusinessSettings::default());
        assert!(ack.subject.contains("Handmade Studio"));
        assert!(ack.body.starts_with("Hi Robin,"));
        assert!(ack.body.contains("2 guests"));
    }
}
