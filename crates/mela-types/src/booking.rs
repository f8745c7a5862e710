//! Service bookings
//!
//! A booking links a customer to a provider through a fixed lifecycle. The
//! legality of each move lives in `mela-lifecycle`; this module only defines
//! the shape and the status vocabulary.

use crate::ids::{BookingId, ProblemId, ProviderId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a booking sits in its lifecycle
///
/// `Declined`, `Cancelled`, and `Completed` are terminal; a booking never
/// leaves a terminal status and is never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Accepted,
    Declined,
    Started,
    AwaitingOtp,
    AwaitingBill,
    AwaitingPayment,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Accepted => "accepted",
            BookingStatus::Declined => "declined",
            BookingStatus::Started => "started",
            BookingStatus::AwaitingOtp => "awaiting_otp",
            BookingStatus::AwaitingBill => "awaiting_bill",
            BookingStatus::AwaitingPayment => "awaiting_payment",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "accepted" => Some(BookingStatus::Accepted),
            "declined" => Some(BookingStatus::Declined),
            "started" => Some(BookingStatus::Started),
            "awaiting_otp" => Some(BookingStatus::AwaitingOtp),
            "awaiting_bill" => Some(BookingStatus::AwaitingBill),
            "awaiting_payment" => Some(BookingStatus::AwaitingPayment),
            "completed" => Some(BookingStatus::Completed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    /// No edges leave a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Declined | BookingStatus::Cancelled | BookingStatus::Completed
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scheduled service request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,

    pub customer_id: UserId,

    /// Assigned atomically when a provider accepts; required before the
    /// booking can leave `pending` for `accepted`
    pub provider_id: Option<ProviderId>,

    /// The problem the customer picked from the category tree
    pub problem_id: ProblemId,

    /// None means "as soon as possible"
    pub scheduled_at: Option<chrono::DateTime<chrono::Utc>>,

    /// Requested time slots, free-form ("morning", "2pm-4pm")
    pub preferred_slots: Vec<String>,

    pub address: String,
    pub phone: String,
    pub notes: Option<String>,

    pub status: BookingStatus,

    /// The 6-digit completion code, present only while the booking is in
    /// `awaiting_otp`. Delivered to the customer out-of-band; never included
    /// in API responses.
    #[serde(skip_serializing)]
    pub service_code: Option<String>,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Creation payload for a booking; the daemon fills in identity and status
#[derive(Debug, Clone, Deserialize)]
pub struct NewBooking {
    pub problem_id: ProblemId,
    #[serde(default)]
    pub scheduled_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub preferred_slots: Vec<String>,
    pub address: String,
    pub phone: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Booking {
    /// Build a fresh `pending` booking for a customer
    pub fn create(customer_id: UserId, new: NewBooking) -> Self {
        let now = chrono::Utc::now();
        Booking {
            id: BookingId::generate(),
            customer_id,
            provider_id: None,
            problem_id: new.problem_id,
            scheduled_at: new.scheduled_at,
            preferred_slots: new.preferred_slots,
            address: new.address,
            phone: new.phone,
            notes: new.notes,
            status: BookingStatus::Pending,
            service_code: None,
            created_at: now,
            updated_at: now,
        }
    }
}
