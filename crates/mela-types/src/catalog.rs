//! Service categories, problem trees, provider profiles, grocery catalog

use crate::ids::{CategoryId, ProblemId, ProductId, ProviderId, UserId};
use serde::{Deserialize, Serialize};

/// A top-level service category (electrician, plumber, beauty, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceCategory {
    pub id: CategoryId,

    pub name: String,

    /// URL-safe identifier, unique ("electrician", "cake-shop", ...)
    pub slug: String,

    /// Short description shown on the storefront
    pub description: Option<String>,
}

/// A node in a category's two-level problem tree
///
/// Top-level problems have `parent_id = None`; refinements point at their
/// parent ("Fan not working" -> "Ceiling fan", "Table fan").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceProblem {
    pub id: ProblemId,
    pub category_id: CategoryId,
    pub parent_id: Option<ProblemId>,
    pub title: String,
    pub description: Option<String>,
}

/// A provider's business profile
///
/// One per user; `rating` and `review_count` are aggregates maintained by
/// review creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceProvider {
    pub id: ProviderId,
    pub user_id: UserId,
    pub category_id: CategoryId,
    pub business_name: String,
    pub description: Option<String>,
    pub experience_years: Option<u32>,
    pub address: Option<String>,

    /// Average review rating, hundredths (450 = 4.50 stars)
    pub rating_hundredths: u32,
    pub review_count: u32,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A product in the shared grocery catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroceryProduct {
    pub id: ProductId,
    pub name: String,

    /// Free-form shelf category ("staples", "dairy")
    pub category: String,

    /// Price per unit in minor currency units
    pub price_minor: i64,

    /// Sale unit ("kg", "500g", "piece")
    pub unit: String,

    pub in_stock: bool,
}
