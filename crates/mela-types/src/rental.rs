//! No-brokerage rental listings

use crate::ids::{PropertyId, UserId};
use serde::{Deserialize, Serialize};

/// A rental property listed directly by its owner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentalProperty {
    pub id: PropertyId,
    pub owner_id: UserId,
    pub title: String,
    pub description: Option<String>,

    /// "apartment", "house", "pg", "shop"
    pub property_type: String,

    /// Monthly rent in minor currency units
    pub rent_minor: i64,

    /// Carpet area in square feet
    pub area_sqft: Option<u32>,

    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,

    /// "furnished", "semi-furnished", "unfurnished"
    pub furnishing: Option<String>,

    pub address: String,
    pub locality: Option<String>,
    pub amenities: Vec<String>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}
