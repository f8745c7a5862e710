//! Webhook verification and payload model
//!
//! The webhook is verified over the raw, unparsed body bytes with its own
//! secret; parsing happens only after the signature checks out. Replays are
//! handled by the caller recording the dedupe key once the effects commit.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Verify the webhook signature header against the raw body
pub fn verify_webhook_signature(webhook_secret: &str, raw_body: &[u8], signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    let Ok(mut m) = HmacSha256::new_from_slice(webhook_secret.as_bytes()) else {
        return false;
    };
    m.update(raw_body);
    m.verify_slice(&expected).is_ok()
}

/// A gateway webhook event, parsed after verification
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    /// Event name, e.g. "payment.captured"
    pub event: String,

    /// Gateway-assigned event id, when present
    #[serde(default)]
    pub event_id: Option<String>,

    pub payload: WebhookPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub payment: Option<PaymentWrapper>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentWrapper {
    pub entity: PaymentEntity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEntity {
    /// Gateway payment id
    pub id: String,

    /// Gateway order id the payment settles
    pub order_id: String,
}

impl WebhookEnvelope {
    /// Whether this event reports a captured payment
    pub fn is_payment_captured(&self) -> bool {
        self.event == "payment.captured" && self.payment().is_some()
    }

    /// The payment entity, if the payload carries one
    pub fn payment(&self) -> Option<&PaymentEntity> {
        self.payload.payment.as_ref().map(|p| &p.entity)
    }

    /// Stable key for replay suppression
    ///
    /// Prefers the gateway's event id; falls back to event + order + payment
    /// so re-deliveries without an id still collapse.
    pub fn dedupe_key(&self) -> String {
        if let Some(id) = &self.event_id {
            return id.clone();
        }
        match self.payment() {
            Some(p) => format!("{}:{}:{}", self.event, p.order_id, p.id),
            None => self.event.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hmac::Mac;

    const SECRET: &str = "whsec_test";

    fn sign(body: &[u8]) -> String {
        let mut m = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        m.update(body);
        hex::encode(m.finalize().into_bytes())
    }

    const BODY: &str = r#"{
        "event": "payment.captured",
        "payload": { "payment": { "entity": { "id": "pay_1", "order_id": "order_9" } } }
    }"#;

    #[test]
    fn test_verify_raw_body() {
        let sig = sign(BODY.as_bytes());
        assert!(verify_webhook_signature(SECRET, BODY.as_bytes(), &sig));
    }

    #[test]
    fn test_body_mutation_rejected() {
        let sig = sign(BODY.as_bytes());
        let tampered = BODY.replace("order_9", "order_8");
        assert!(!verify_webhook_signature(SECRET, tampered.as_bytes(), &sig));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let sig = sign(BODY.as_bytes());
        assert!(!verify_webhook_signature("whsec_other", BODY.as_bytes(), &sig));
    }

    #[test]
    fn test_parse_captured_payment() {
        let envelope: WebhookEnvelope = serde_json::from_str(BODY).unwrap();
        assert!(envelope.is_payment_captured());
        let payment = envelope.payment().unwrap();
        assert_eq!(payment.id, "pay_1");
        assert_eq!(payment.order_id, "order_9");
        assert_eq!(envelope.dedupe_key(), "payment.captured:order_9:pay_1");
    }

    #[test]
    fn test_dedupe_key_prefers_event_id() {
        let body = r#"{
            "event": "payment.captured",
            "event_id": "evt_42",
            "payload": { "payment": { "entity": { "id": "pay_1", "order_id": "order_9" } } }
        }"#;
        let envelope: WebhookEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.dedupe_key(), "evt_42");
    }

    #[test]
    fn test_non_payment_event_parses() {
        let body = r#"{ "event": "refund.created", "payload": {} }"#;
        let envelope: WebhookEnvelope = serde_json::from_str(body).unwrap();
        assert!(!envelope.is_payment_captured());
        assert_eq!(envelope.dedupe_key(), "refund.created");
    }
}
