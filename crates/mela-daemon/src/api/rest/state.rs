//! Shared application state

use crate::config::PaymentsConfig;
use crate::session::SessionStore;
use crate::storage::Storage;
use mela_notify::Notifier;
use mela_payments::PaymentGateway;
use std::sync::Arc;

/// State handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub sessions: Arc<SessionStore>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub notifier: Arc<dyn Notifier>,
    pub payments: PaymentsConfig,
}
