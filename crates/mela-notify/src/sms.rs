//! SMS provider clients

use crate::{DeliveryReceipt, Notifier, NotifyError};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Credentials and endpoint for the SMS provider's REST API
#[derive(Debug, Clone)]
pub struct SmsProviderConfig {
    /// API base, e.g. "https://api.twilio.com"
    pub base_url: String,
    pub account_sid: String,
    pub api_key: String,
    pub api_secret: String,
    /// Sender number, E.164
    pub from_number: String,
    pub timeout: Duration,
}

#[derive(Deserialize)]
struct ProviderResponse {
    sid: Option<String>,
}

/// Twilio-shaped messages client
pub struct HttpSmsNotifier {
    client: reqwest::Client,
    config: SmsProviderConfig,
}

impl HttpSmsNotifier {
    pub fn new(config: SmsProviderConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Notifier for HttpSmsNotifier {
    async fn send(&self, to: &str, body: &str) -> Result<DeliveryReceipt, NotifyError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.base_url.trim_end_matches('/'),
            self.config.account_sid
        );

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
            .form(&[
                ("To", to),
                ("From", self.config.from_number.as_str()),
                ("Body", body),
            ])
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected(format!("{status}: {text}")));
        }

        let parsed: ProviderResponse = response
            .json()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        Ok(DeliveryReceipt {
            message_id: parsed.sid,
        })
    }
}

/// Logs instead of sending; the default when no provider is configured
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send(&self, to: &str, body: &str) -> Result<DeliveryReceipt, NotifyError> {
        tracing::info!(to = %to, body = %body, "sms suppressed (no provider configured)");
        Ok(DeliveryReceipt { message_id: None })
    }
}
