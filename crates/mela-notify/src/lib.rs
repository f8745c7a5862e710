//! Mela Notify - best-effort SMS dispatch
//!
//! Status changes and completion codes reach the customer by SMS. Delivery
//! is never on the critical path: the state transition has already
//! committed by the time a message is sent, and a provider outage only
//! produces a warning in the logs.

#![deny(unsafe_code)]

pub mod sms;
pub mod templates;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub use sms::{HttpSmsNotifier, NoopNotifier, SmsProviderConfig};

/// Delivery failure; logged, never propagated into request handling
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("provider rejected message: {0}")]
    Rejected(String),

    #[error("provider unreachable: {0}")]
    Transport(String),
}

/// Proof of hand-off to the provider
#[derive(Debug, Clone)]
pub struct DeliveryReceipt {
    /// Provider-assigned message id, when the provider returns one
    pub message_id: Option<String>,
}

/// The messaging-provider contract
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `body` to the E.164 number `to`
    async fn send(&self, to: &str, body: &str) -> Result<DeliveryReceipt, NotifyError>;
}

/// Fire-and-forget dispatch
///
/// Spawns the send so the caller returns immediately; failures are logged
/// at warn and do not roll back the transition that triggered them.
pub fn dispatch(notifier: Arc<dyn Notifier>, to: String, body: String) {
    tokio::spawn(async move {
        match notifier.send(&to, &body).await {
            Ok(receipt) => {
                tracing::debug!(to = %to, message_id = ?receipt.message_id, "sms dispatched");
            }
            Err(err) => {
                tracing::warn!(to = %to, error = %err, "sms delivery failed");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dispatch_survives_provider_failure() {
        struct FailingNotifier;

        #[async_trait]
        impl Notifier for FailingNotifier {
            async fn send(&self, _to: &str, _body: &str) -> Result<DeliveryReceipt, NotifyError> {
                Err(NotifyError::Transport("wire down".into()))
            }
        }

        // must not panic the task or the caller
        dispatch(Arc::new(FailingNotifier), "+911234567890".into(), "hi".into());
        tokio::task::yield_now().await;
    }
}
