//! Provider reviews

use crate::ids::{BookingId, ProviderId, ReviewId, UserId};
use serde::{Deserialize, Serialize};

/// A customer's rating of a provider
///
/// Creating one recomputes the provider's aggregate rating and review count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub customer_id: UserId,
    pub provider_id: ProviderId,
    pub booking_id: Option<BookingId>,

    /// 1 to 5 stars
    pub rating: u8,

    pub comment: Option<String>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}
