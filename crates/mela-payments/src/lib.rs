//! Mela Payments - gateway orders and signature reconciliation
//!
//! Two independent verification paths prove a payment to us:
//!
//! 1. the synchronous client confirmation, an HMAC-SHA256 over
//!    `order_id|payment_id` with the key secret, and
//! 2. the asynchronous webhook, an HMAC-SHA256 over the raw body bytes with
//!    a separate webhook secret, checked before any parsing.
//!
//! Verification is local; nothing is delegated to a gateway SDK. Failure is
//! a value (`false` / a typed error), never a panic: an unverified payment
//! leaves the order unpaid and the caller decides what to report.

#![deny(unsafe_code)]

pub mod error;
pub mod gateway;
pub mod signature;
pub mod webhook;

pub use error::PaymentError;
pub use gateway::{GatewayOrder, HttpGateway, PaymentGateway, SandboxGateway};
pub use signature::{payment_signature, verify_payment_signature};
pub use webhook::{verify_webhook_signature, WebhookEnvelope};
