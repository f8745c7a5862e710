//! Catalog purchase orders (grocery)

use crate::ids::{OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order status; `paid` is reached only through verified reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "paid" => Some(OrderStatus::Paid),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of an order; `unit_price_minor` is the catalog price at order
/// time, resolved server-side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price_minor: i64,
}

impl OrderLine {
    pub fn line_total_minor(&self) -> i64 {
        self.unit_price_minor * i64::from(self.quantity)
    }
}

/// A grocery order
///
/// Invariant: `total_minor == subtotal_minor + platform_fee_minor +
/// delivery_fee_minor`, exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: UserId,
    pub lines: Vec<OrderLine>,
    pub subtotal_minor: i64,
    pub platform_fee_minor: i64,
    pub delivery_fee_minor: i64,
    pub total_minor: i64,
    pub delivery_address: String,

    /// External payment-intent reference, set once a gateway order exists
    pub gateway_order_id: Option<String>,

    /// Gateway payment id, recorded on successful verification
    pub payment_id: Option<String>,

    pub status: OrderStatus,

    pub created_at: chrono::DateTime<chrono::Utc>,
}
