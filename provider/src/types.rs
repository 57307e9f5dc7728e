//! Wire types for the Crypto Pay-style provider API
//!
//! All amounts travel as decimal strings on the wire and are parsed into
//! [`Decimal`]; binary floats never touch money.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Envelope every provider response arrives in
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub error: Option<ApiErrorBody>,
}

/// Error payload inside a failed envelope
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub code: i64,
    pub name: String,
}

/// Freshly created invoice, ready to be shown to the user
#[derive(Debug, Clone, Deserialize)]
pub struct NewInvoice {
    /// Provider-assigned invoice id (the external key)
    pub invoice_id: i64,
    /// URL the user opens to pay
    pub pay_url: String,
}

/// Invoice status as reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// Awaiting payment
    Active,
    /// Paid by the user
    Paid,
    /// Expired unpaid
    Expired,
}

/// Snapshot of one invoice from a status poll
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceSnapshot {
    /// Provider-assigned invoice id
    pub invoice_id: i64,
    /// Current status
    pub status: InvoiceStatus,
    /// Invoice amount
    pub amount: Decimal,
}

/// Page of invoices returned by a status query
#[derive(Debug, Deserialize)]
pub(crate) struct InvoicePage {
    pub items: Vec<InvoiceSnapshot>,
}

/// Receipt for an accepted transfer
#[derive(Debug, Clone, Deserialize)]
pub struct TransferReceipt {
    /// Provider-assigned transfer id
    pub transfer_id: i64,
}

/// Per-asset balance of the application's provider account
#[derive(Debug, Clone, Deserialize)]
pub struct AssetBalance {
    /// Asset code, e.g. "USDT"
    pub currency_code: String,
    /// Amount available for transfers
    pub available: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoice_status_parses_lowercase() {
        let s: InvoiceStatus = serde_json::from_str("\"paid\"").unwrap();
        assert_eq!(s, InvoiceStatus::Paid);
        let s: InvoiceStatus = serde_json::from_str("\"active\"").unwrap();
        assert_eq!(s, InvoiceStatus::Active);
    }

    #[test]
    fn amounts_parse_from_strings() {
        let snap: InvoiceSnapshot = serde_json::from_str(
            r#"{"invoice_id": 42, "status": "paid", "amount": "20.50"}"#,
        )
        .unwrap();
        assert_eq!(snap.amount, Decimal::new(2050, 2));
    }
}
