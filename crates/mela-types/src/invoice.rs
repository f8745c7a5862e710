//! Invoices
//!
//! The itemized bill a provider raises after the completion code checks out.
//! Immutable once created: it represents a bill already sent to the customer
//! and is what payment reconciliation treats as the amount due.

use crate::ids::{BookingId, InvoiceId};
use serde::{Deserialize, Serialize};

/// One itemized charge on an invoice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparePart {
    pub name: String,

    /// Minor currency units
    pub price_minor: i64,
}

/// The final bill for a booking; exactly one per booking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub booking_id: BookingId,
    pub spare_parts: Vec<SparePart>,
    pub service_charge_minor: i64,
    pub notes: Option<String>,

    /// Always sum(spare_parts) + service_charge_minor; recomputed
    /// server-side, never taken from a client
    pub total_minor: i64,

    /// Set when a gateway order is created for this invoice
    pub gateway_order_id: Option<String>,

    /// Gateway payment id, recorded on successful verification
    pub payment_id: Option<String>,

    pub paid: bool,

    pub created_at: chrono::DateTime<chrono::Utc>,
}
