//! HTTP client for the Crypto Pay API family
//!
//! Responses arrive as an `{ok, result, error}` envelope; a non-`ok`
//! envelope carries an explicit `{code, name}` error payload which is
//! surfaced verbatim as [`Error::Api`].

use crate::{
    connector::PaymentProvider,
    error::{Error, Result},
    types::*,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::json;

const TOKEN_HEADER: &str = "Crypto-Pay-API-Token";

/// Crypto Pay HTTP client
pub struct CryptoPayClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    invoice_asset: String,
}

impl CryptoPayClient {
    /// Create a client against `base_url` (no trailing slash) with an API token
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
            invoice_asset: "USDT".to_string(),
        }
    }

    /// Set the asset new invoices are denominated in
    pub fn with_invoice_asset(mut self, asset: impl Into<String>) -> Self {
        self.invoice_asset = asset.into();
        self
    }

    fn url(&self, method: &str) -> String {
        format!("{}/api/{}", self.base_url, method)
    }

    async fn post<T: DeserializeOwned>(
        &self,
        method: &'static str,
        payload: serde_json::Value,
    ) -> Result<T> {
        let response = self
            .http
            .post(self.url(method))
            .header(TOKEN_HEADER, &self.token)
            .json(&payload)
            .send()
            .await?;

        Self::unwrap_envelope(method, response).await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        method: &'static str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self
            .http
            .get(self.url(method))
            .header(TOKEN_HEADER, &self.token)
            .query(query)
            .send()
            .await?;

        Self::unwrap_envelope(method, response).await
    }

    async fn unwrap_envelope<T: DeserializeOwned>(
        method: &'static str,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response.bytes().await?;

        let envelope: Envelope<T> = match serde_json::from_slice(&body) {
            Ok(envelope) => envelope,
            Err(err) if !status.is_success() => {
                return Err(Error::Network(format!("HTTP {status}: {err}")));
            }
            Err(err) => return Err(err.into()),
        };

        if !envelope.ok {
            let (code, message) = envelope
                .error
                .map(|e| (e.code, e.name))
                .unwrap_or((status.as_u16() as i64, "unknown provider error".to_string()));
            tracing::warn!(method, code, %message, "provider rejected request");
            return Err(Error::Api { code, message });
        }

        envelope.result.ok_or(Error::MissingResult(method))
    }
}

#[async_trait]
impl PaymentProvider for CryptoPayClient {
    async fn create_invoice(&self, amount: Decimal, description: &str) -> Result<NewInvoice> {
        self.post(
            "createInvoice",
            json!({
                "asset": self.invoice_asset,
                "amount": amount,
                "description": description,
            }),
        )
        .await
    }

    async fn invoice_status(&self, invoice_id: &str) -> Result<InvoiceSnapshot> {
        let page: InvoicePage = self
            .get("getInvoices", &[("invoice_ids", invoice_id.to_string())])
            .await?;

        page.items
            .into_iter()
            .next()
            .ok_or(Error::MissingResult("getInvoices"))
    }

    async fn create_transfer(
        &self,
        user_id: u64,
        asset: &str,
        amount: Decimal,
        spend_id: &str,
    ) -> Result<TransferReceipt> {
        self.post(
            "transfer",
            json!({
                "user_id": user_id,
                "asset": asset,
                "amount": amount,
                "spend_id": spend_id,
            }),
        )
        .await
    }

    async fn available_balance(&self, asset: &str) -> Result<Decimal> {
        let balances: Vec<AssetBalance> = self.get("getBalance", &[]).await?;

        balances
            .into_iter()
            .find(|b| b.currency_code == asset)
            .map(|b| b.available)
            .ok_or(Error::MissingResult("getBalance"))
    }

    fn name(&self) -> &str {
        "crypto-pay"
    }
}
