//! Storefront menu items
//!
//! Four storefront categories share one menu-item shape. The category is a
//! closed enum: unknown slugs are rejected at the routing boundary instead of
//! being dispatched dynamically to a backing table.

use crate::ids::{ItemId, ProviderId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The storefront categories that carry provider-managed menus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MenuCategory {
    Beauty,
    CakeShop,
    StreetFood,
    Restaurant,
}

/// Unknown storefront slug
#[derive(Debug, Error)]
#[error("unknown menu category: {0}")]
pub struct UnknownCategory(pub String);

impl MenuCategory {
    pub const ALL: [MenuCategory; 4] = [
        MenuCategory::Beauty,
        MenuCategory::CakeShop,
        MenuCategory::StreetFood,
        MenuCategory::Restaurant,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            MenuCategory::Beauty => "beauty",
            MenuCategory::CakeShop => "cake-shop",
            MenuCategory::StreetFood => "street-food",
            MenuCategory::Restaurant => "restaurant",
        }
    }

    pub fn parse_slug(slug: &str) -> Result<Self, UnknownCategory> {
        match slug {
            "beauty" => Ok(MenuCategory::Beauty),
            "cake-shop" => Ok(MenuCategory::CakeShop),
            "street-food" => Ok(MenuCategory::StreetFood),
            "restaurant" | "restaurants" => Ok(MenuCategory::Restaurant),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

impl fmt::Display for MenuCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// A provider-owned menu entry (a beauty service, a cake, a dish)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: ItemId,
    pub provider_id: ProviderId,
    pub category: MenuCategory,
    pub name: String,
    pub description: Option<String>,

    /// Price in minor currency units
    pub price_minor: i64,

    /// Hidden from public listings when false
    pub available: bool,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_roundtrip() {
        for category in MenuCategory::ALL {
            assert_eq!(MenuCategory::parse_slug(category.slug()).unwrap(), category);
        }
    }

    #[test]
    fn test_restaurants_alias() {
        assert_eq!(
            MenuCategory::parse_slug("restaurants").unwrap(),
            MenuCategory::Restaurant
        );
    }

    #[test]
    fn test_unknown_slug_rejected() {
        let err = MenuCategory::parse_slug("groceries").unwrap_err();
        assert_eq!(err.0, "groceries");
    }
}
