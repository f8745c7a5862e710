//! Restaurant table bookings

use crate::ids::{ProviderId, TableBookingId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Table booking status; a plain three-state flow, not the service lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableBookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl TableBookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableBookingStatus::Pending => "pending",
            TableBookingStatus::Confirmed => "confirmed",
            TableBookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TableBookingStatus::Pending),
            "confirmed" => Some(TableBookingStatus::Confirmed),
            "cancelled" => Some(TableBookingStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for TableBookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reserved table at a restaurant provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableBooking {
    pub id: TableBookingId,
    pub customer_id: UserId,
    pub provider_id: ProviderId,
    pub party_size: u32,
    pub booked_for: chrono::DateTime<chrono::Utc>,
    pub notes: Option<String>,
    pub status: TableBookingStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
