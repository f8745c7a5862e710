//! Gateway order creation
//!
//! A gateway order binds a local order or invoice to the external payment
//! intent. Creation is the only remote call; verification stays local.

use crate::error::PaymentError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The gateway's record of a payment intent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayOrder {
    /// Gateway-assigned order id ("order_...")
    pub id: String,

    /// Amount in minor currency units
    pub amount: i64,

    pub currency: String,
}

/// The createOrder contract; verification is not part of it
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a gateway order for `amount_minor`
    ///
    /// `receipt` is our local reference, echoed back in dashboards.
    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, PaymentError>;
}

#[derive(Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

/// HTTP client for the real gateway's orders endpoint
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl HttpGateway {
    /// Build a client with a bounded request timeout
    pub fn new(
        base_url: impl Into<String>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PaymentError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, PaymentError> {
        let url = format!("{}/v1/orders", self.base_url);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&CreateOrderBody {
                amount: amount_minor,
                currency,
                receipt,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "gateway order creation failed");
            return Err(PaymentError::Gateway(format!("{status}: {body}")));
        }

        let order: GatewayOrder = response
            .json()
            .await
            .map_err(|e| PaymentError::InvalidResponse(e.to_string()))?;

        tracing::info!(gateway_order_id = %order.id, amount = order.amount, "created gateway order");
        Ok(order)
    }
}

/// Local stand-in gateway for development and tests
///
/// Fabricates order ids without any network call; pairs with
/// [`crate::payment_signature`] to produce confirmations the verifier
/// accepts.
pub struct SandboxGateway;

#[async_trait]
impl PaymentGateway for SandboxGateway {
    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        _receipt: &str,
    ) -> Result<GatewayOrder, PaymentError> {
        let id = format!("order_{}", uuid::Uuid::new_v4().simple());
        tracing::debug!(gateway_order_id = %id, "created sandbox order");
        Ok(GatewayOrder {
            id,
            amount: amount_minor,
            currency: currency.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sandbox_orders_are_unique() {
        let gateway = SandboxGateway;
        let a = gateway.create_order(25000, "INR", "r1").await.unwrap();
        let b = gateway.create_order(25000, "INR", "r1").await.unwrap();
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("order_"));
        assert_eq!(a.amount, 25000);
        assert_eq!(a.currency, "INR");
    }
}
