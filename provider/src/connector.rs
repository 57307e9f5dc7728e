//! Payment provider interface

use crate::{types::*, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// External payment provider
///
/// The wallet core treats the provider as an opaque external ledger. All
/// methods are fallible and network-bound; none of them may be called
/// while a balance mutation is in flight. Transfers carry a caller-chosen
/// `spend_id` so retries are idempotent on the provider side.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create an invoice the user can pay
    async fn create_invoice(&self, amount: Decimal, description: &str) -> Result<NewInvoice>;

    /// Fetch the current status of an invoice
    async fn invoice_status(&self, invoice_id: &str) -> Result<InvoiceSnapshot>;

    /// Transfer funds to a user's provider-side account
    async fn create_transfer(
        &self,
        user_id: u64,
        asset: &str,
        amount: Decimal,
        spend_id: &str,
    ) -> Result<TransferReceipt>;

    /// Available float of the application account for `asset`
    async fn available_balance(&self, asset: &str) -> Result<Decimal>;

    /// Connector name (for logs)
    fn name(&self) -> &str;
}
