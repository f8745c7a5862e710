//! Demo data for the in-memory backend
//!
//! Installs the service categories, the electrician problem tree, and a
//! small grocery shelf so a fresh daemon has something to serve.

use super::traits::{CatalogStore, GroceryStore, StorageResult};
use mela_types::{
    CategoryId, GroceryProduct, ProblemId, ProductId, ServiceCategory, ServiceProblem,
};

const CATEGORIES: [(&str, &str, &str); 7] = [
    ("Electrician", "electrician", "Appliance repair and electrical work"),
    ("Plumber", "plumber", "Pipes, taps, and bathroom fittings"),
    ("Beauty", "beauty", "Salon services at home"),
    ("Cake Shop", "cake-shop", "Custom cakes and bakes"),
    ("Street Food", "street-food", "Local street food vendors"),
    ("Restaurant", "restaurant", "Dine-in and table bookings"),
    ("Grocery", "grocery", "Daily essentials delivered"),
];

const ELECTRICIAN_PROBLEMS: [(&str, &[&str]); 6] = [
    (
        "Air Conditioner (AC)",
        &[
            "Not cooling properly",
            "Water leakage",
            "Unusual noises",
            "Bad odor from vents",
            "Remote not working",
            "Power turning on/off frequently",
            "Frozen coils",
            "High electricity consumption",
        ],
    ),
    (
        "Refrigerator",
        &[
            "Not cooling or overcooling",
            "Water leakage",
            "Fridge making loud or unusual noise",
            "Ice maker not working",
            "Frost build-up in freezer",
            "Fridge light not working",
            "Compressor issues",
            "Door not closing properly",
        ],
    ),
    (
        "Television (TV)",
        &[
            "No display / black screen",
            "No sound",
            "Remote not working",
            "HDMI/AV ports not functioning",
            "TV turning on and off by itself",
            "Distorted image or colors",
            "Lines on the screen",
            "Wall mount installation needed",
        ],
    ),
    (
        "Water Heater (Geyser)",
        &[
            "Not heating water",
            "Water leakage",
            "Unusual noises",
            "Electrical tripping when turned on",
            "Low hot water pressure",
            "Foul smell from hot water",
            "Thermostat not working",
        ],
    ),
    (
        "Washing Machine",
        &[
            "Not spinning",
            "Water not draining",
            "Door not opening",
            "Vibrating excessively",
            "Leaking water",
        ],
    ),
    (
        "Microwave Oven",
        &[
            "Not heating food",
            "Sparking inside",
            "Buttons not responding",
            "Turntable not rotating",
        ],
    ),
];

// (name, shelf, price in minor units, unit)
const GROCERY_SHELF: [(&str, &str, i64, &str); 8] = [
    ("Basmati Rice", "staples", 12_000, "kg"),
    ("Toor Dal", "staples", 16_000, "kg"),
    ("Sunflower Oil", "staples", 14_500, "litre"),
    ("Milk", "dairy", 3_200, "500ml"),
    ("Paneer", "dairy", 9_000, "200g"),
    ("Tomatoes", "vegetables", 4_000, "kg"),
    ("Onions", "vegetables", 3_500, "kg"),
    ("Bananas", "fruits", 5_000, "dozen"),
];

/// Install the demo catalog into an empty backend
pub async fn install<S>(storage: &S) -> StorageResult<()>
where
    S: CatalogStore + GroceryStore + ?Sized,
{
    let mut electrician_id = None;
    for (name, slug, description) in CATEGORIES {
        let category = storage
            .create_category(ServiceCategory {
                id: CategoryId::generate(),
                name: name.to_string(),
                slug: slug.to_string(),
                description: Some(description.to_string()),
            })
            .await?;
        if slug == "electrician" {
            electrician_id = Some(category.id);
        }
    }

    if let Some(category_id) = electrician_id {
        for (device, issues) in ELECTRICIAN_PROBLEMS {
            let parent = storage
                .create_problem(ServiceProblem {
                    id: ProblemId::generate(),
                    category_id,
                    parent_id: None,
                    title: device.to_string(),
                    description: None,
                })
                .await?;
            for issue in issues {
                storage
                    .create_problem(ServiceProblem {
                        id: ProblemId::generate(),
                        category_id,
                        parent_id: Some(parent.id),
                        title: issue.to_string(),
                        description: None,
                    })
                    .await?;
            }
        }
    }

    for (name, shelf, price_minor, unit) in GROCERY_SHELF {
        storage
            .create_product(GroceryProduct {
                id: ProductId::generate(),
                name: name.to_string(),
                category: shelf.to_string(),
                price_minor,
                unit: unit.to_string(),
                in_stock: true,
            })
            .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;

    #[tokio::test]
    async fn test_install_populates_catalog() {
        let storage = InMemoryStorage::new();
        install(&storage).await.unwrap();

        let categories = storage.list_categories().await.unwrap();
        assert_eq!(categories.len(), 7);

        let electrician = storage
            .get_category_by_slug("electrician")
            .await
            .unwrap()
            .unwrap();
        let problems = storage.list_problems(&electrician.id).await.unwrap();
        let parents = problems.iter().filter(|p| p.parent_id.is_none()).count();
        assert_eq!(parents, 6);
        assert!(problems.len() > parents);

        assert_eq!(storage.list_products().await.unwrap().len(), 8);
    }
}
