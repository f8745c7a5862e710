//! PostgreSQL storage backend
//!
//! Ids are stored as their text form, nested collections as JSONB, statuses
//! as their snake_case strings. Compare-and-set writes are conditional
//! UPDATEs; zero affected rows is disambiguated into NotFound or Conflict
//! with a follow-up existence check. Combined writes run in a transaction.

use super::traits::*;
use crate::error::StorageError;
use async_trait::async_trait;
use mela_types::{
    Booking, BookingId, BookingStatus, CategoryId, GroceryProduct, Invoice, InvoiceId, ItemId,
    MenuCategory, MenuItem, Order, OrderId, OrderLine, OrderStatus, ProblemId, ProductId,
    PropertyId, ProviderId, RentalProperty, Review, ReviewId, ServiceCategory, ServiceProblem,
    ServiceProvider, SparePart, TableBooking, TableBookingId, TableBookingStatus, User, UserId,
};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::Row;
use std::time::Duration;

/// PostgreSQL-backed storage
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Connect and ensure the schema exists
    pub async fn connect(
        url: &str,
        max_connections: u32,
        connect_timeout: Duration,
    ) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(connect_timeout)
            .connect(url)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let storage = Self { pool };
        storage.migrate().await?;
        Ok(storage)
    }

    async fn migrate(&self) -> StorageResult<()> {
        let statements = [
            r#"CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL,
                phone TEXT,
                created_at TIMESTAMPTZ NOT NULL
            )"#,
            r#"CREATE TABLE IF NOT EXISTS service_categories (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE,
                description TEXT
            )"#,
            r#"CREATE TABLE IF NOT EXISTS service_problems (
                id TEXT PRIMARY KEY,
                category_id TEXT NOT NULL REFERENCES service_categories(id),
                parent_id TEXT,
                title TEXT NOT NULL,
                description TEXT
            )"#,
            r#"CREATE TABLE IF NOT EXISTS service_providers (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL UNIQUE REFERENCES users(id),
                category_id TEXT NOT NULL REFERENCES service_categories(id),
                business_name TEXT NOT NULL,
                description TEXT,
                experience_years INT,
                address TEXT,
                rating_hundredths INT NOT NULL DEFAULT 0,
                review_count INT NOT NULL DEFAULT 0,
                created_at TIMESTAMPTZ NOT NULL
            )"#,
            r#"CREATE TABLE IF NOT EXISTS menu_items (
                id TEXT PRIMARY KEY,
                provider_id TEXT NOT NULL REFERENCES service_providers(id),
                category TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                price_minor BIGINT NOT NULL,
                available BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL
            )"#,
            r#"CREATE TABLE IF NOT EXISTS grocery_products (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                category TEXT NOT NULL,
                price_minor BIGINT NOT NULL,
                unit TEXT NOT NULL,
                in_stock BOOLEAN NOT NULL DEFAULT TRUE
            )"#,
            r#"CREATE TABLE IF NOT EXISTS bookings (
                id TEXT PRIMARY KEY,
                customer_id TEXT NOT NULL REFERENCES users(id),
                provider_id TEXT REFERENCES service_providers(id),
                problem_id TEXT NOT NULL REFERENCES service_problems(id),
                scheduled_at TIMESTAMPTZ,
                preferred_slots JSONB NOT NULL DEFAULT '[]',
                address TEXT NOT NULL,
                phone TEXT NOT NULL,
                notes TEXT,
                status TEXT NOT NULL,
                service_code TEXT,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )"#,
            r#"CREATE TABLE IF NOT EXISTS invoices (
                id TEXT PRIMARY KEY,
                booking_id TEXT NOT NULL UNIQUE REFERENCES bookings(id),
                spare_parts JSONB NOT NULL DEFAULT '[]',
                service_charge_minor BIGINT NOT NULL,
                notes TEXT,
                total_minor BIGINT NOT NULL,
                gateway_order_id TEXT UNIQUE,
                payment_id TEXT,
                paid BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL
            )"#,
            r#"CREATE TABLE IF NOT EXISTS orders (
                id TEXT PRIMARY KEY,
                customer_id TEXT NOT NULL REFERENCES users(id),
                lines JSONB NOT NULL,
                subtotal_minor BIGINT NOT NULL,
                platform_fee_minor BIGINT NOT NULL,
                delivery_fee_minor BIGINT NOT NULL,
                total_minor BIGINT NOT NULL,
                delivery_address TEXT NOT NULL,
                gateway_order_id TEXT UNIQUE,
                payment_id TEXT,
                status TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )"#,
            r#"CREATE TABLE IF NOT EXISTS reviews (
                id TEXT PRIMARY KEY,
                customer_id TEXT NOT NULL REFERENCES users(id),
                provider_id TEXT NOT NULL REFERENCES service_providers(id),
                booking_id TEXT,
                rating SMALLINT NOT NULL,
                comment TEXT,
                created_at TIMESTAMPTZ NOT NULL
            )"#,
            r#"CREATE TABLE IF NOT EXISTS rental_properties (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL REFERENCES users(id),
                title TEXT NOT NULL,
                description TEXT,
                property_type TEXT NOT NULL,
                rent_minor BIGINT NOT NULL,
                area_sqft INT,
                bedrooms INT,
                bathrooms INT,
                furnishing TEXT,
                address TEXT NOT NULL,
                locality TEXT,
                amenities JSONB NOT NULL DEFAULT '[]',
                created_at TIMESTAMPTZ NOT NULL
            )"#,
            r#"CREATE TABLE IF NOT EXISTS table_bookings (
                id TEXT PRIMARY KEY,
                customer_id TEXT NOT NULL REFERENCES users(id),
                provider_id TEXT NOT NULL REFERENCES service_providers(id),
                party_size INT NOT NULL,
                booked_for TIMESTAMPTZ NOT NULL,
                notes TEXT,
                status TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )"#,
            r#"CREATE TABLE IF NOT EXISTS payment_events (
                dedupe_key TEXT PRIMARY KEY,
                received_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )"#,
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_err)?;
        }
        Ok(())
    }

    async fn booking_exists(&self, id: &BookingId) -> StorageResult<bool> {
        let row = sqlx::query("SELECT 1 FROM bookings WHERE id = $1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(row.is_some())
    }
}

fn map_sqlx_err(err: sqlx::Error) -> StorageError {
    match &err {
        sqlx::Error::RowNotFound => StorageError::NotFound(err.to_string()),
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StorageError::Conflict(err.to_string())
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => StorageError::Connection(err.to_string()),
        _ => StorageError::Query(err.to_string()),
    }
}

fn parse_id<T, E>(
    raw: &str,
    parse: impl Fn(&str) -> Result<T, E>,
    what: &str,
) -> StorageResult<T> {
    parse(raw).map_err(|_| StorageError::InvalidData(format!("bad {what} id: {raw}")))
}

fn row_to_user(row: &PgRow) -> StorageResult<User> {
    Ok(User {
        id: parse_id(&row.get::<String, _>("id"), UserId::parse, "user")?,
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role: mela_types::Role::parse(&row.get::<String, _>("role"))
            .ok_or_else(|| StorageError::InvalidData("bad role".into()))?,
        phone: row.get("phone"),
        created_at: row.get("created_at"),
    })
}

fn row_to_category(row: &PgRow) -> StorageResult<ServiceCategory> {
    Ok(ServiceCategory {
        id: parse_id(&row.get::<String, _>("id"), CategoryId::parse, "category")?,
        name: row.get("name"),
        slug: row.get("slug"),
        description: row.get("description"),
    })
}

fn row_to_problem(row: &PgRow) -> StorageResult<ServiceProblem> {
    let parent: Option<String> = row.get("parent_id");
    Ok(ServiceProblem {
        id: parse_id(&row.get::<String, _>("id"), ProblemId::parse, "problem")?,
        category_id: parse_id(&row.get::<String, _>("category_id"), CategoryId::parse, "category")?,
        parent_id: parent
            .map(|p| parse_id(&p, ProblemId::parse, "problem"))
            .transpose()?,
        title: row.get("title"),
        description: row.get("description"),
    })
}

fn row_to_provider(row: &PgRow) -> StorageResult<ServiceProvider> {
    Ok(ServiceProvider {
        id: parse_id(&row.get::<String, _>("id"), ProviderId::parse, "provider")?,
        user_id: parse_id(&row.get::<String, _>("user_id"), UserId::parse, "user")?,
        category_id: parse_id(&row.get::<String, _>("category_id"), CategoryId::parse, "category")?,
        business_name: row.get("business_name"),
        description: row.get("description"),
        experience_years: row.get::<Option<i32>, _>("experience_years").map(|v| v as u32),
        address: row.get("address"),
        rating_hundredths: row.get::<i32, _>("rating_hundredths") as u32,
        review_count: row.get::<i32, _>("review_count") as u32,
        created_at: row.get("created_at"),
    })
}

fn row_to_menu_item(row: &PgRow) -> StorageResult<MenuItem> {
    Ok(MenuItem {
        id: parse_id(&row.get::<String, _>("id"), ItemId::parse, "menu item")?,
        provider_id: parse_id(&row.get::<String, _>("provider_id"), ProviderId::parse, "provider")?,
        category: MenuCategory::parse_slug(&row.get::<String, _>("category"))
            .map_err(|e| StorageError::InvalidData(e.to_string()))?,
        name: row.get("name"),
        description: row.get("description"),
        price_minor: row.get("price_minor"),
        available: row.get("available"),
        created_at: row.get("created_at"),
    })
}

fn row_to_product(row: &PgRow) -> StorageResult<GroceryProduct> {
    Ok(GroceryProduct {
        id: parse_id(&row.get::<String, _>("id"), ProductId::parse, "product")?,
        name: row.get("name"),
        category: row.get("category"),
        price_minor: row.get("price_minor"),
        unit: row.get("unit"),
        in_stock: row.get("in_stock"),
    })
}

fn row_to_booking(row: &PgRow) -> StorageResult<Booking> {
    let provider: Option<String> = row.get("provider_id");
    Ok(Booking {
        id: parse_id(&row.get::<String, _>("id"), BookingId::parse, "booking")?,
        customer_id: parse_id(&row.get::<String, _>("customer_id"), UserId::parse, "user")?,
        provider_id: provider
            .map(|p| parse_id(&p, ProviderId::parse, "provider"))
            .transpose()?,
        problem_id: parse_id(&row.get::<String, _>("problem_id"), ProblemId::parse, "problem")?,
        scheduled_at: row.get("scheduled_at"),
        preferred_slots: row.get::<Json<Vec<String>>, _>("preferred_slots").0,
        address: row.get("address"),
        phone: row.get("phone"),
        notes: row.get("notes"),
        status: BookingStatus::parse(&row.get::<String, _>("status"))
            .ok_or_else(|| StorageError::InvalidData("bad booking status".into()))?,
        service_code: row.get("service_code"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_invoice(row: &PgRow) -> StorageResult<Invoice> {
    Ok(Invoice {
        id: parse_id(&row.get::<String, _>("id"), InvoiceId::parse, "invoice")?,
        booking_id: parse_id(&row.get::<String, _>("booking_id"), BookingId::parse, "booking")?,
        spare_parts: row.get::<Json<Vec<SparePart>>, _>("spare_parts").0,
        service_charge_minor: row.get("service_charge_minor"),
        notes: row.get("notes"),
        total_minor: row.get("total_minor"),
        gateway_order_id: row.get("gateway_order_id"),
        payment_id: row.get("payment_id"),
        paid: row.get("paid"),
        created_at: row.get("created_at"),
    })
}

fn row_to_order(row: &PgRow) -> StorageResult<Order> {
    Ok(Order {
        id: parse_id(&row.get::<String, _>("id"), OrderId::parse, "order")?,
        customer_id: parse_id(&row.get::<String, _>("customer_id"), UserId::parse, "user")?,
        lines: row.get::<Json<Vec<OrderLine>>, _>("lines").0,
        subtotal_minor: row.get("subtotal_minor"),
        platform_fee_minor: row.get("platform_fee_minor"),
        delivery_fee_minor: row.get("delivery_fee_minor"),
        total_minor: row.get("total_minor"),
        delivery_address: row.get("delivery_address"),
        gateway_order_id: row.get("gateway_order_id"),
        payment_id: row.get("payment_id"),
        status: OrderStatus::parse(&row.get::<String, _>("status"))
            .ok_or_else(|| StorageError::InvalidData("bad order status".into()))?,
        created_at: row.get("created_at"),
    })
}

fn row_to_review(row: &PgRow) -> StorageResult<Review> {
    let booking: Option<String> = row.get("booking_id");
    Ok(Review {
        id: parse_id(&row.get::<String, _>("id"), ReviewId::parse, "review")?,
        customer_id: parse_id(&row.get::<String, _>("customer_id"), UserId::parse, "user")?,
        provider_id: parse_id(&row.get::<String, _>("provider_id"), ProviderId::parse, "provider")?,
        booking_id: booking
            .map(|b| parse_id(&b, BookingId::parse, "booking"))
            .transpose()?,
        rating: row.get::<i16, _>("rating") as u8,
        comment: row.get("comment"),
        created_at: row.get("created_at"),
    })
}

fn row_to_property(row: &PgRow) -> StorageResult<RentalProperty> {
    Ok(RentalProperty {
        id: parse_id(&row.get::<String, _>("id"), PropertyId::parse, "property")?,
        owner_id: parse_id(&row.get::<String, _>("owner_id"), UserId::parse, "user")?,
        title: row.get("title"),
        description: row.get("description"),
        property_type: row.get("property_type"),
        rent_minor: row.get("rent_minor"),
        area_sqft: row.get::<Option<i32>, _>("area_sqft").map(|v| v as u32),
        bedrooms: row.get::<Option<i32>, _>("bedrooms").map(|v| v as u32),
        bathrooms: row.get::<Option<i32>, _>("bathrooms").map(|v| v as u32),
        furnishing: row.get("furnishing"),
        address: row.get("address"),
        locality: row.get("locality"),
        amenities: row.get::<Json<Vec<String>>, _>("amenities").0,
        created_at: row.get("created_at"),
    })
}

fn row_to_table_booking(row: &PgRow) -> StorageResult<TableBooking> {
    Ok(TableBooking {
        id: parse_id(&row.get::<String, _>("id"), TableBookingId::parse, "table booking")?,
        customer_id: parse_id(&row.get::<String, _>("customer_id"), UserId::parse, "user")?,
        provider_id: parse_id(&row.get::<String, _>("provider_id"), ProviderId::parse, "provider")?,
        party_size: row.get::<i32, _>("party_size") as u32,
        booked_for: row.get("booked_for"),
        notes: row.get("notes"),
        status: TableBookingStatus::parse(&row.get::<String, _>("status"))
            .ok_or_else(|| StorageError::InvalidData("bad table booking status".into()))?,
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl UserStore for PostgresStorage {
    async fn create_user(&self, user: User) -> StorageResult<User> {
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, role, phone, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.phone)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(user)
    }

    async fn get_user(&self, id: &UserId) -> StorageResult<Option<User>> {
        sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?
            .map(|row| row_to_user(&row))
            .transpose()
    }

    async fn get_user_by_username(&self, username: &str) -> StorageResult<Option<User>> {
        sqlx::query("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?
            .map(|row| row_to_user(&row))
            .transpose()
    }
}

#[async_trait]
impl CatalogStore for PostgresStorage {
    async fn create_category(&self, category: ServiceCategory) -> StorageResult<ServiceCategory> {
        sqlx::query(
            "INSERT INTO service_categories (id, name, slug, description) VALUES ($1, $2, $3, $4)",
        )
        .bind(category.id.to_string())
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(category)
    }

    async fn list_categories(&self) -> StorageResult<Vec<ServiceCategory>> {
        sqlx::query("SELECT * FROM service_categories ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)?
            .iter()
            .map(row_to_category)
            .collect()
    }

    async fn get_category_by_slug(&self, slug: &str) -> StorageResult<Option<ServiceCategory>> {
        sqlx::query("SELECT * FROM service_categories WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?
            .map(|row| row_to_category(&row))
            .transpose()
    }

    async fn create_problem(&self, problem: ServiceProblem) -> StorageResult<ServiceProblem> {
        sqlx::query(
            "INSERT INTO service_problems (id, category_id, parent_id, title, description)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(problem.id.to_string())
        .bind(problem.category_id.to_string())
        .bind(problem.parent_id.map(|p| p.to_string()))
        .bind(&problem.title)
        .bind(&problem.description)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(problem)
    }

    async fn list_problems(&self, category_id: &CategoryId) -> StorageResult<Vec<ServiceProblem>> {
        sqlx::query(
            "SELECT * FROM service_problems WHERE category_id = $1
             ORDER BY (parent_id IS NOT NULL), title",
        )
        .bind(category_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        .iter()
        .map(row_to_problem)
        .collect()
    }

    async fn get_problem(&self, id: &ProblemId) -> StorageResult<Option<ServiceProblem>> {
        sqlx::query("SELECT * FROM service_problems WHERE id = $1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?
            .map(|row| row_to_problem(&row))
            .transpose()
    }

    async fn create_provider(&self, provider: ServiceProvider) -> StorageResult<ServiceProvider> {
        sqlx::query(
            "INSERT INTO service_providers
             (id, user_id, category_id, business_name, description, experience_years, address,
              rating_hundredths, review_count, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(provider.id.to_string())
        .bind(provider.user_id.to_string())
        .bind(provider.category_id.to_string())
        .bind(&provider.business_name)
        .bind(&provider.description)
        .bind(provider.experience_years.map(|v| v as i32))
        .bind(&provider.address)
        .bind(provider.rating_hundredths as i32)
        .bind(provider.review_count as i32)
        .bind(provider.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(provider)
    }

    async fn get_provider(&self, id: &ProviderId) -> StorageResult<Option<ServiceProvider>> {
        sqlx::query("SELECT * FROM service_providers WHERE id = $1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?
            .map(|row| row_to_provider(&row))
            .transpose()
    }

    async fn get_provider_by_user(
        &self,
        user_id: &UserId,
    ) -> StorageResult<Option<ServiceProvider>> {
        sqlx::query("SELECT * FROM service_providers WHERE user_id = $1")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?
            .map(|row| row_to_provider(&row))
            .transpose()
    }

    async fn list_providers_by_category(
        &self,
        category_id: &CategoryId,
    ) -> StorageResult<Vec<ServiceProvider>> {
        sqlx::query(
            "SELECT * FROM service_providers WHERE category_id = $1 ORDER BY rating_hundredths DESC",
        )
        .bind(category_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        .iter()
        .map(row_to_provider)
        .collect()
    }
}

#[async_trait]
impl MenuItemStore for PostgresStorage {
    async fn create_menu_item(&self, item: MenuItem) -> StorageResult<MenuItem> {
        sqlx::query(
            "INSERT INTO menu_items
             (id, provider_id, category, name, description, price_minor, available, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(item.id.to_string())
        .bind(item.provider_id.to_string())
        .bind(item.category.slug())
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.price_minor)
        .bind(item.available)
        .bind(item.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(item)
    }

    async fn get_menu_item(
        &self,
        id: &ItemId,
        category: MenuCategory,
    ) -> StorageResult<Option<MenuItem>> {
        sqlx::query("SELECT * FROM menu_items WHERE id = $1 AND category = $2")
            .bind(id.to_string())
            .bind(category.slug())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?
            .map(|row| row_to_menu_item(&row))
            .transpose()
    }

    async fn list_menu_items(&self, category: MenuCategory) -> StorageResult<Vec<MenuItem>> {
        sqlx::query("SELECT * FROM menu_items WHERE category = $1 ORDER BY name")
            .bind(category.slug())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)?
            .iter()
            .map(row_to_menu_item)
            .collect()
    }

    async fn list_menu_items_for_provider(
        &self,
        provider_id: &ProviderId,
        category: MenuCategory,
    ) -> StorageResult<Vec<MenuItem>> {
        sqlx::query(
            "SELECT * FROM menu_items WHERE provider_id = $1 AND category = $2 ORDER BY name",
        )
        .bind(provider_id.to_string())
        .bind(category.slug())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        .iter()
        .map(row_to_menu_item)
        .collect()
    }

    async fn update_menu_item(
        &self,
        id: &ItemId,
        category: MenuCategory,
        update: MenuItemUpdate,
    ) -> StorageResult<MenuItem> {
        let row = sqlx::query(
            "UPDATE menu_items SET
                name = COALESCE($3, name),
                description = COALESCE($4, description),
                price_minor = COALESCE($5, price_minor),
                available = COALESCE($6, available)
             WHERE id = $1 AND category = $2
             RETURNING *",
        )
        .bind(id.to_string())
        .bind(category.slug())
        .bind(update.name)
        .bind(update.description)
        .bind(update.price_minor)
        .bind(update.available)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        .ok_or_else(|| StorageError::NotFound(format!("menu item: {id}")))?;
        row_to_menu_item(&row)
    }

    async fn delete_menu_item(&self, id: &ItemId, category: MenuCategory) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM menu_items WHERE id = $1 AND category = $2")
            .bind(id.to_string())
            .bind(category.slug())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("menu item: {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl GroceryStore for PostgresStorage {
    async fn create_product(&self, product: GroceryProduct) -> StorageResult<GroceryProduct> {
        sqlx::query(
            "INSERT INTO grocery_products (id, name, category, price_minor, unit, in_stock)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(product.id.to_string())
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.price_minor)
        .bind(&product.unit)
        .bind(product.in_stock)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(product)
    }

    async fn list_products(&self) -> StorageResult<Vec<GroceryProduct>> {
        sqlx::query("SELECT * FROM grocery_products ORDER BY category, name")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)?
            .iter()
            .map(row_to_product)
            .collect()
    }

    async fn get_product(&self, id: &ProductId) -> StorageResult<Option<GroceryProduct>> {
        sqlx::query("SELECT * FROM grocery_products WHERE id = $1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?
            .map(|row| row_to_product(&row))
            .transpose()
    }
}

#[async_trait]
impl BookingStore for PostgresStorage {
    async fn create_booking(&self, booking: Booking) -> StorageResult<Booking> {
        sqlx::query(
            "INSERT INTO bookings
             (id, customer_id, provider_id, problem_id, scheduled_at, preferred_slots,
              address, phone, notes, status, service_code, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(booking.id.to_string())
        .bind(booking.customer_id.to_string())
        .bind(booking.provider_id.map(|p| p.to_string()))
        .bind(booking.problem_id.to_string())
        .bind(booking.scheduled_at)
        .bind(Json(&booking.preferred_slots))
        .bind(&booking.address)
        .bind(&booking.phone)
        .bind(&booking.notes)
        .bind(booking.status.as_str())
        .bind(&booking.service_code)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(booking)
    }

    async fn get_booking(&self, id: &BookingId) -> StorageResult<Option<Booking>> {
        sqlx::query("SELECT * FROM bookings WHERE id = $1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?
            .map(|row| row_to_booking(&row))
            .transpose()
    }

    async fn list_bookings_for_customer(
        &self,
        customer_id: &UserId,
    ) -> StorageResult<Vec<Booking>> {
        sqlx::query("SELECT * FROM bookings WHERE customer_id = $1 ORDER BY created_at DESC")
            .bind(customer_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)?
            .iter()
            .map(row_to_booking)
            .collect()
    }

    async fn list_bookings_for_provider(
        &self,
        provider_id: &ProviderId,
    ) -> StorageResult<Vec<Booking>> {
        sqlx::query("SELECT * FROM bookings WHERE provider_id = $1 ORDER BY created_at DESC")
            .bind(provider_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)?
            .iter()
            .map(row_to_booking)
            .collect()
    }

    async fn list_pending_for_category(
        &self,
        category_id: &CategoryId,
    ) -> StorageResult<Vec<Booking>> {
        sqlx::query(
            "SELECT b.* FROM bookings b
             JOIN service_problems p ON p.id = b.problem_id
             WHERE b.status = 'pending' AND b.provider_id IS NULL AND p.category_id = $1
             ORDER BY b.created_at",
        )
        .bind(category_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        .iter()
        .map(row_to_booking)
        .collect()
    }

    async fn update_booking_if_status(
        &self,
        id: &BookingId,
        expected: BookingStatus,
        next: BookingStatus,
        patch: BookingPatch,
    ) -> StorageResult<Booking> {
        // $5 toggles whether service_code is written at all
        let row = sqlx::query(
            "UPDATE bookings SET
                status = $3,
                provider_id = COALESCE($4, provider_id),
                service_code = CASE WHEN $5 THEN $6 ELSE service_code END,
                updated_at = now()
             WHERE id = $1 AND status = $2
             RETURNING *",
        )
        .bind(id.to_string())
        .bind(expected.as_str())
        .bind(next.as_str())
        .bind(patch.provider_id.map(|p| p.to_string()))
        .bind(patch.service_code.is_some())
        .bind(patch.service_code.flatten())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        match row {
            Some(row) => row_to_booking(&row),
            None if self.booking_exists(id).await? => Err(StorageError::Conflict(format!(
                "booking {id} is no longer {expected}"
            ))),
            None => Err(StorageError::NotFound(format!("booking: {id}"))),
        }
    }
}

#[async_trait]
impl InvoiceStore for PostgresStorage {
    async fn create_invoice_for_booking(&self, invoice: Invoice) -> StorageResult<Invoice> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let moved = sqlx::query(
            "UPDATE bookings SET status = 'awaiting_payment', updated_at = now()
             WHERE id = $1 AND status = 'awaiting_bill'",
        )
        .bind(invoice.booking_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;
        if moved.rows_affected() == 0 {
            return if self.booking_exists(&invoice.booking_id).await? {
                Err(StorageError::Conflict(format!(
                    "booking {} is not awaiting a bill",
                    invoice.booking_id
                )))
            } else {
                Err(StorageError::NotFound(format!(
                    "booking: {}",
                    invoice.booking_id
                )))
            };
        }

        sqlx::query(
            "INSERT INTO invoices
             (id, booking_id, spare_parts, service_charge_minor, notes, total_minor,
              gateway_order_id, payment_id, paid, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(invoice.id.to_string())
        .bind(invoice.booking_id.to_string())
        .bind(Json(&invoice.spare_parts))
        .bind(invoice.service_charge_minor)
        .bind(&invoice.notes)
        .bind(invoice.total_minor)
        .bind(&invoice.gateway_order_id)
        .bind(&invoice.payment_id)
        .bind(invoice.paid)
        .bind(invoice.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        tx.commit().await.map_err(map_sqlx_err)?;
        Ok(invoice)
    }

    async fn get_invoice(&self, id: &InvoiceId) -> StorageResult<Option<Invoice>> {
        sqlx::query("SELECT * FROM invoices WHERE id = $1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?
            .map(|row| row_to_invoice(&row))
            .transpose()
    }

    async fn get_invoice_for_booking(
        &self,
        booking_id: &BookingId,
    ) -> StorageResult<Option<Invoice>> {
        sqlx::query("SELECT * FROM invoices WHERE booking_id = $1")
            .bind(booking_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?
            .map(|row| row_to_invoice(&row))
            .transpose()
    }

    async fn set_invoice_gateway_order(
        &self,
        id: &InvoiceId,
        gateway_order_id: &str,
    ) -> StorageResult<Invoice> {
        let row = sqlx::query(
            "UPDATE invoices SET gateway_order_id = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id.to_string())
        .bind(gateway_order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        .ok_or_else(|| StorageError::NotFound(format!("invoice: {id}")))?;
        row_to_invoice(&row)
    }

    async fn find_invoice_by_gateway_order(
        &self,
        gateway_order_id: &str,
    ) -> StorageResult<Option<Invoice>> {
        sqlx::query("SELECT * FROM invoices WHERE gateway_order_id = $1")
            .bind(gateway_order_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?
            .map(|row| row_to_invoice(&row))
            .transpose()
    }

    async fn mark_invoice_paid(&self, id: &InvoiceId, payment_id: &str) -> StorageResult<bool> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let row = sqlx::query(
            "UPDATE invoices SET paid = TRUE, payment_id = $2
             WHERE id = $1 AND paid = FALSE
             RETURNING booking_id",
        )
        .bind(id.to_string())
        .bind(payment_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        let Some(row) = row else {
            // Already paid, or missing entirely
            let exists = sqlx::query("SELECT 1 FROM invoices WHERE id = $1")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_err)?
                .is_some();
            return if exists {
                Ok(false)
            } else {
                Err(StorageError::NotFound(format!("invoice: {id}")))
            };
        };

        let booking_id: String = row.get("booking_id");
        sqlx::query(
            "UPDATE bookings SET status = 'completed', updated_at = now()
             WHERE id = $1 AND status = 'awaiting_payment'",
        )
        .bind(booking_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        tx.commit().await.map_err(map_sqlx_err)?;
        Ok(true)
    }
}

#[async_trait]
impl OrderStore for PostgresStorage {
    async fn create_order(&self, order: Order) -> StorageResult<Order> {
        sqlx::query(
            "INSERT INTO orders
             (id, customer_id, lines, subtotal_minor, platform_fee_minor, delivery_fee_minor,
              total_minor, delivery_address, gateway_order_id, payment_id, status, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(order.id.to_string())
        .bind(order.customer_id.to_string())
        .bind(Json(&order.lines))
        .bind(order.subtotal_minor)
        .bind(order.platform_fee_minor)
        .bind(order.delivery_fee_minor)
        .bind(order.total_minor)
        .bind(&order.delivery_address)
        .bind(&order.gateway_order_id)
        .bind(&order.payment_id)
        .bind(order.status.as_str())
        .bind(order.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(order)
    }

    async fn get_order(&self, id: &OrderId) -> StorageResult<Option<Order>> {
        sqlx::query("SELECT * FROM orders WHERE id = $1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?
            .map(|row| row_to_order(&row))
            .transpose()
    }

    async fn list_orders_for_customer(&self, customer_id: &UserId) -> StorageResult<Vec<Order>> {
        sqlx::query("SELECT * FROM orders WHERE customer_id = $1 ORDER BY created_at DESC")
            .bind(customer_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)?
            .iter()
            .map(row_to_order)
            .collect()
    }

    async fn set_order_gateway_order(
        &self,
        id: &OrderId,
        gateway_order_id: &str,
    ) -> StorageResult<Order> {
        let row = sqlx::query("UPDATE orders SET gateway_order_id = $2 WHERE id = $1 RETURNING *")
            .bind(id.to_string())
            .bind(gateway_order_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?
            .ok_or_else(|| StorageError::NotFound(format!("order: {id}")))?;
        row_to_order(&row)
    }

    async fn find_order_by_gateway_order(
        &self,
        gateway_order_id: &str,
    ) -> StorageResult<Option<Order>> {
        sqlx::query("SELECT * FROM orders WHERE gateway_order_id = $1")
            .bind(gateway_order_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?
            .map(|row| row_to_order(&row))
            .transpose()
    }

    async fn mark_order_paid(&self, id: &OrderId, payment_id: &str) -> StorageResult<bool> {
        let result = sqlx::query(
            "UPDATE orders SET status = 'paid', payment_id = $2
             WHERE id = $1 AND status <> 'paid'",
        )
        .bind(id.to_string())
        .bind(payment_id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }
        let exists = sqlx::query("SELECT 1 FROM orders WHERE id = $1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?
            .is_some();
        if exists {
            Ok(false)
        } else {
            Err(StorageError::NotFound(format!("order: {id}")))
        }
    }
}

#[async_trait]
impl ReviewStore for PostgresStorage {
    async fn create_review(&self, review: Review) -> StorageResult<Review> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        sqlx::query(
            "INSERT INTO reviews (id, customer_id, provider_id, booking_id, rating, comment, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(review.id.to_string())
        .bind(review.customer_id.to_string())
        .bind(review.provider_id.to_string())
        .bind(review.booking_id.map(|b| b.to_string()))
        .bind(i16::from(review.rating))
        .bind(&review.comment)
        .bind(review.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        let updated = sqlx::query(
            "UPDATE service_providers SET
                rating_hundredths = ((rating_hundredths::bigint * review_count + $2 * 100)
                                     / (review_count + 1))::int,
                review_count = review_count + 1
             WHERE id = $1",
        )
        .bind(review.provider_id.to_string())
        .bind(i64::from(review.rating))
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;
        if updated.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!(
                "provider: {}",
                review.provider_id
            )));
        }

        tx.commit().await.map_err(map_sqlx_err)?;
        Ok(review)
    }

    async fn list_reviews_for_provider(
        &self,
        provider_id: &ProviderId,
    ) -> StorageResult<Vec<Review>> {
        sqlx::query("SELECT * FROM reviews WHERE provider_id = $1 ORDER BY created_at DESC")
            .bind(provider_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)?
            .iter()
            .map(row_to_review)
            .collect()
    }
}

#[async_trait]
impl RentalStore for PostgresStorage {
    async fn create_property(&self, property: RentalProperty) -> StorageResult<RentalProperty> {
        sqlx::query(
            "INSERT INTO rental_properties
             (id, owner_id, title, description, property_type, rent_minor, area_sqft,
              bedrooms, bathrooms, furnishing, address, locality, amenities, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(property.id.to_string())
        .bind(property.owner_id.to_string())
        .bind(&property.title)
        .bind(&property.description)
        .bind(&property.property_type)
        .bind(property.rent_minor)
        .bind(property.area_sqft.map(|v| v as i32))
        .bind(property.bedrooms.map(|v| v as i32))
        .bind(property.bathrooms.map(|v| v as i32))
        .bind(&property.furnishing)
        .bind(&property.address)
        .bind(&property.locality)
        .bind(Json(&property.amenities))
        .bind(property.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(property)
    }

    async fn list_properties(&self) -> StorageResult<Vec<RentalProperty>> {
        sqlx::query("SELECT * FROM rental_properties ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)?
            .iter()
            .map(row_to_property)
            .collect()
    }

    async fn get_property(&self, id: &PropertyId) -> StorageResult<Option<RentalProperty>> {
        sqlx::query("SELECT * FROM rental_properties WHERE id = $1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?
            .map(|row| row_to_property(&row))
            .transpose()
    }

    async fn delete_property(&self, id: &PropertyId) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM rental_properties WHERE id = $1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("property: {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl TableStore for PostgresStorage {
    async fn create_table_booking(&self, booking: TableBooking) -> StorageResult<TableBooking> {
        sqlx::query(
            "INSERT INTO table_bookings
             (id, customer_id, provider_id, party_size, booked_for, notes, status, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(booking.id.to_string())
        .bind(booking.customer_id.to_string())
        .bind(booking.provider_id.to_string())
        .bind(booking.party_size as i32)
        .bind(booking.booked_for)
        .bind(&booking.notes)
        .bind(booking.status.as_str())
        .bind(booking.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(booking)
    }

    async fn get_table_booking(&self, id: &TableBookingId) -> StorageResult<Option<TableBooking>> {
        sqlx::query("SELECT * FROM table_bookings WHERE id = $1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?
            .map(|row| row_to_table_booking(&row))
            .transpose()
    }

    async fn list_table_bookings_for_customer(
        &self,
        customer_id: &UserId,
    ) -> StorageResult<Vec<TableBooking>> {
        sqlx::query("SELECT * FROM table_bookings WHERE customer_id = $1 ORDER BY created_at DESC")
            .bind(customer_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)?
            .iter()
            .map(row_to_table_booking)
            .collect()
    }

    async fn list_table_bookings_for_provider(
        &self,
        provider_id: &ProviderId,
    ) -> StorageResult<Vec<TableBooking>> {
        sqlx::query("SELECT * FROM table_bookings WHERE provider_id = $1 ORDER BY created_at DESC")
            .bind(provider_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)?
            .iter()
            .map(row_to_table_booking)
            .collect()
    }

    async fn update_table_booking_status(
        &self,
        id: &TableBookingId,
        expected: TableBookingStatus,
        next: TableBookingStatus,
    ) -> StorageResult<TableBooking> {
        let row = sqlx::query(
            "UPDATE table_bookings SET status = $3 WHERE id = $1 AND status = $2 RETURNING *",
        )
        .bind(id.to_string())
        .bind(expected.as_str())
        .bind(next.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        match row {
            Some(row) => row_to_table_booking(&row),
            None => {
                let exists = sqlx::query("SELECT 1 FROM table_bookings WHERE id = $1")
                    .bind(id.to_string())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_err)?
                    .is_some();
                if exists {
                    Err(StorageError::Conflict(format!(
                        "table booking {id} is no longer {expected}"
                    )))
                } else {
                    Err(StorageError::NotFound(format!("table booking: {id}")))
                }
            }
        }
    }
}

#[async_trait]
impl PaymentEventStore for PostgresStorage {
    async fn record_payment_event(&self, dedupe_key: &str) -> StorageResult<bool> {
        let result = sqlx::query(
            "INSERT INTO payment_events (dedupe_key) VALUES ($1) ON CONFLICT DO NOTHING",
        )
        .bind(dedupe_key)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(result.rows_affected() == 1)
    }
}
