//! Stripe event payload types.
//!
//! Only the fields the webhook handler reads are modeled; everything else
//! in the event is ignored. Every field is optional or defaulted so that
//! events of unrelated types (whose `data.object` is not an invoice)
//! still deserialize and can be acknowledged without processing.

use serde::Deserialize;

/// A webhook event envelope.
#[derive(Debug, Default, Deserialize)]
pub struct Event {
    /// Provider event id (evt_...).
    #[serde(default)]
    pub id: String,
    /// Event type, e.g. `invoice.payment_succeeded`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event payload.
    #[serde(default)]
    pub data: EventData,
}

/// The `data` wrapper around the event object.
#[derive(Debug, Default, Deserialize)]
pub struct EventData {
    /// The object the event describes, read as an invoice.
    #[serde(default)]
    pub object: Invoice,
}

/// The slice of a Stripe invoice the handler consumes.
#[derive(Debug, Default, Deserialize)]
pub struct Invoice {
    /// Invoice id (in_...).
    pub id: Option<String>,
    /// Customer email, required for the upsert.
    pub customer_email: Option<String>,
    /// Customer phone, optional.
    pub customer_phone: Option<String>,
    /// Subscription id, logged when interval derivation fails.
    pub subscription: Option<String>,
    /// Invoice line items.
    #[serde(default)]
    pub lines: InvoiceLines,
}

/// Invoice line-item list wrapper.
#[derive(Debug, Default, Deserialize)]
pub struct InvoiceLines {
    /// The line items.
    #[serde(default)]
    pub data: Vec<InvoiceLine>,
}

/// A single invoice line item.
#[derive(Debug, Default, Deserialize)]
pub struct InvoiceLine {
    /// Free-text description, e.g. `1 × Owner's Report — Monthly (at $29.00 / month)`.
    pub description: Option<String>,
}

impl Invoice {
    /// The description of the first line item, if any.
    #[must_use]
    pub fn first_line_description(&self) -> Option<&str> {
        self.lines.data.first().and_then(|l| l.description.as_deref())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_invoice_payment_succeeded() {
        let raw = r#"{
            "id": "evt_1ABC",
            "type": "invoice.payment_succeeded",
            "data": {
                "object": {
                    "id": "in_1XYZ",
                    "object": "invoice",
                    "customer_email": "c@d.com",
                    "customer_phone": null,
                    "subscription": "sub_123",
                    "amount_paid": 2900,
                    "lines": {
                        "object": "list",
                        "data": [
                            { "description": "1 × Plan — Monthly", "quantity": 1 }
                        ]
                    }
                }
            }
        }"#;

        let event: Event = serde_json::from_str(raw).unwrap();
        assert_eq!(event.id, "evt_1ABC");
        assert_eq!(event.event_type, "invoice.payment_succeeded");

        let invoice = &event.data.object;
        assert_eq!(invoice.customer_email.as_deref(), Some("c@d.com"));
        assert_eq!(invoice.customer_phone, None);
        assert_eq!(invoice.first_line_description(), Some("1 × Plan — Monthly"));
    }

    #[test]
    fn test_deserialize_unrelated_event_type() {
        // A customer object is not an invoice; the handler only needs the
        // type to know it can acknowledge and stop.
        let raw = r#"{
            "id": "evt_2DEF",
            "type": "customer.created",
            "data": {
                "object": {
                    "id": "cus_123",
                    "object": "customer",
                    "name": "Someone"
                }
            }
        }"#;

        let event: Event = serde_json::from_str(raw).unwrap();
        assert_eq!(event.event_type, "customer.created");
        assert_eq!(event.data.object.customer_email, None);
        assert_eq!(event.data.object.first_line_description(), None);
    }

    #[test]
    fn test_deserialize_missing_lines() {
        let raw = r#"{
            "type": "invoice.payment_succeeded",
            "data": { "object": { "customer_email": "a@b.com" } }
        }"#;

        let event: Event = serde_json::from_str(raw).unwrap();
        assert_eq!(event.data.object.first_line_description(), None);
    }
}
