//! Records returned by the Scalingo API.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Date format of billing months and of the invoice filters.
pub const BILLING_MONTH_DATE_FORMAT: &str = "%Y-%m-%d";

/// The calendar month an invoice covers, carried as its first day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BillingMonth(NaiveDate);

impl BillingMonth {
    /// Parse a `YYYY-MM-DD` string.
    pub fn parse(value: &str) -> Result<Self, chrono::ParseError> {
        NaiveDate::parse_from_str(value, BILLING_MONTH_DATE_FORMAT).map(Self)
    }

    /// The underlying date.
    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Midnight UTC on the billing date.
    pub fn to_datetime(&self) -> DateTime<Utc> {
        self.0.and_time(NaiveTime::MIN).and_utc()
    }
}

impl fmt::Display for BillingMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(BILLING_MONTH_DATE_FORMAT))
    }
}

impl Serialize for BillingMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BillingMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// An invoice of the authenticated account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    /// Invoice ID.
    pub id: String,
    /// Total price, in cents, without VAT.
    pub total_price: i64,
    /// Total price, in cents, with VAT.
    pub total_price_with_vat: i64,
    /// Month covered by the invoice.
    pub billing_month: BillingMonth,
    /// Link to the PDF version.
    #[serde(default)]
    pub pdf_url: String,
    /// Human-facing invoice number.
    #[serde(default)]
    pub invoice_number: String,
    /// Payment state (e.g. `paid`).
    #[serde(default)]
    pub state: String,
    /// VAT rate, in hundredths of a percent.
    #[serde(default)]
    pub vat_rate: i64,
    /// Flat line items.
    #[serde(default)]
    pub items: Vec<InvoiceItem>,
    /// Line items broken down per application.
    #[serde(default)]
    pub detailed_items: Vec<DetailedInvoiceItem>,
}

/// A line of an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceItem {
    /// Item ID.
    pub id: String,
    /// Description of the item.
    pub label: String,
    /// Price, in cents.
    pub price: i64,
}

/// A line of an invoice attributed to one application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedInvoiceItem {
    /// Item ID.
    pub id: String,
    /// Description of the item.
    pub label: String,
    /// Price, in cents.
    pub price: i64,
    /// Application the item is billed for.
    pub app: String,
}

/// Status of a collaboration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollaboratorStatus {
    /// The invitation has been sent but not accepted yet.
    Pending,
    /// The invited user accepted the invitation.
    Accepted,
    /// Any status this crate does not know about.
    #[serde(other)]
    Unknown,
}

impl CollaboratorStatus {
    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Unknown => "unknown",
        }
    }
}

/// A user invited on an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborator {
    /// Collaboration ID, assigned by the platform.
    pub id: String,
    /// Email the invitation was sent to.
    pub email: String,
    /// Username of the account, once the invitation is accepted.
    #[serde(default)]
    pub username: String,
    /// Invitation status.
    pub status: CollaboratorStatus,
    /// ID of the application.
    #[serde(default)]
    pub app_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_billing_month_round_trip() {
        let month = BillingMonth::parse("2023-02-01").unwrap();
        assert_eq!(month.to_string(), "2023-02-01");
        assert_eq!(month.to_datetime().to_rfc3339(), "2023-02-01T00:00:00+00:00");
        assert_eq!(serde_json::to_value(month).unwrap(), json!("2023-02-01"));
    }

    #[test]
    fn test_billing_month_rejects_garbage() {
        assert!(BillingMonth::parse("February 2023").is_err());
        assert!(serde_json::from_value::<BillingMonth>(json!("2023-02")).is_err());
    }

    #[test]
    fn test_decode_invoice() {
        let invoice: Invoice = serde_json::from_value(json!({
            "id": "inv-1",
            "total_price": 1000,
            "total_price_with_vat": 1200,
            "billing_month": "2023-02-01",
            "pdf_url": "https://example.com/inv-1.pdf",
            "invoice_number": "2023-02-0001",
            "state": "paid",
            "vat_rate": 2000,
            "items": [{"id": "it-1", "label": "Containers", "price": 1000}],
            "detailed_items": [{"id": "dit-1", "label": "Containers", "price": 1000, "app": "my-app"}]
        }))
        .unwrap();

        assert_eq!(invoice.billing_month.date(), NaiveDate::from_ymd_opt(2023, 2, 1).unwrap());
        assert_eq!(invoice.items.len(), 1);
        assert_eq!(invoice.detailed_items[0].app, "my-app");
    }

    #[test]
    fn test_decode_collaborator() {
        let pending: Collaborator = serde_json::from_value(json!({
            "id": "abc",
            "email": "c@example.com",
            "username": "n/a",
            "status": "pending",
            "app_id": "app-id"
        }))
        .unwrap();
        assert_eq!(pending.status, CollaboratorStatus::Pending);
        assert_eq!(pending.status.as_str(), "pending");

        let accepted: Collaborator = serde_json::from_value(json!({
            "id": "def",
            "email": "d@example.com",
            "status": "accepted"
        }))
        .unwrap();
        assert_eq!(accepted.username, "");
        assert_eq!(accepted.status, CollaboratorStatus::Accepted);
    }

    #[test]
    fn test_decode_unlisted_status() {
        let collaborators: Vec<Collaborator> = serde_json::from_value(json!([
            {"id": "abc", "email": "c@example.com", "status": "deleted"},
            {"id": "def", "email": "d@example.com", "status": "accepted"}
        ]))
        .unwrap();

        assert_eq!(collaborators[0].status, CollaboratorStatus::Unknown);
        assert_eq!(collaborators[0].status.as_str(), "unknown");
        assert_eq!(collaborators[1].status, CollaboratorStatus::Accepted);
    }
}
