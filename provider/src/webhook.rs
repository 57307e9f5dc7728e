//! Inbound webhook payload parsing
//!
//! The provider pushes `invoice_paid` updates at-least-once; the same
//! invoice may also be observed through a user-initiated status poll.
//! Parsing only extracts the fields the reconciliation entry point needs;
//! deduplication is the wallet core's job.

use crate::{
    error::{Error, Result},
    types::InvoiceStatus,
};
use rust_decimal::Decimal;
use serde::Deserialize;

/// An invoice observation extracted from a webhook body
#[derive(Debug, Clone)]
pub struct InvoiceEvent {
    /// Provider invoice id (external key)
    pub invoice_id: String,
    /// Observed status
    pub status: InvoiceStatus,
    /// Observed amount, when the payload carries one
    pub amount: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_type: String,
    payload: Option<Payload>,
}

#[derive(Debug, Deserialize)]
struct Payload {
    invoice_id: i64,
    status: InvoiceStatus,
    amount: Option<Decimal>,
}

/// Parse a raw webhook body
///
/// Returns `Ok(None)` for update types that carry no invoice observation;
/// a malformed `invoice_paid` update is an error.
pub fn parse_update(body: &str) -> Result<Option<InvoiceEvent>> {
    let update: Update =
        serde_json::from_str(body).map_err(|e| Error::Webhook(format!("invalid body: {e}")))?;

    if update.update_type != "invoice_paid" {
        return Ok(None);
    }

    let payload = update
        .payload
        .ok_or_else(|| Error::Webhook("invoice_paid update without payload".to_string()))?;

    Ok(Some(InvoiceEvent {
        invoice_id: payload.invoice_id.to_string(),
        status: payload.status,
        amount: payload.amount,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paid_update_parses() {
        let body = r#"{
            "update_type": "invoice_paid",
            "payload": { "invoice_id": 99, "status": "paid", "amount": "20.0" }
        }"#;

        let event = parse_update(body).unwrap().unwrap();
        assert_eq!(event.invoice_id, "99");
        assert_eq!(event.status, InvoiceStatus::Paid);
        assert_eq!(event.amount, Some(Decimal::new(200, 1)));
    }

    #[test]
    fn unrelated_update_is_skipped() {
        let body = r#"{ "update_type": "app_heartbeat" }"#;
        assert!(parse_update(body).unwrap().is_none());
    }

    #[test]
    fn paid_update_without_payload_is_rejected() {
        let body = r#"{ "update_type": "invoice_paid" }"#;
        assert!(matches!(parse_update(body), Err(Error::Webhook(_))));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_update("not json").is_err());
    }
}
