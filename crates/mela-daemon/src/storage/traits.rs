//! Storage trait definitions

use crate::error::StorageError;
use async_trait::async_trait;
use mela_types::{
    Booking, BookingId, BookingStatus, CategoryId, GroceryProduct, Invoice, InvoiceId, ItemId,
    MenuCategory, MenuItem, Order, OrderId, ProblemId, ProductId, PropertyId, ProviderId,
    RentalProperty, Review, ServiceCategory, ServiceProblem, ServiceProvider, TableBooking,
    TableBookingId, TableBookingStatus, User, UserId,
};

pub type StorageResult<T> = Result<T, StorageError>;

/// Field changes applied together with a booking status move
///
/// `service_code` is doubly optional: `None` leaves the column untouched,
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct BookingPatch {
    pub provider_id: Option<ProviderId>,
    pub service_code: Option<Option<String>>,
}

/// Partial update for a provider's menu item
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct MenuItemUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_minor: Option<i64>,
    pub available: Option<bool>,
}

/// Accounts
#[async_trait]
pub trait UserStore {
    /// Insert a new account; Conflict when the username or email is taken
    async fn create_user(&self, user: User) -> StorageResult<User>;

    async fn get_user(&self, id: &UserId) -> StorageResult<Option<User>>;

    async fn get_user_by_username(&self, username: &str) -> StorageResult<Option<User>>;
}

/// Service categories, problem trees, and provider profiles
#[async_trait]
pub trait CatalogStore {
    async fn create_category(&self, category: ServiceCategory) -> StorageResult<ServiceCategory>;

    async fn list_categories(&self) -> StorageResult<Vec<ServiceCategory>>;

    async fn get_category_by_slug(&self, slug: &str) -> StorageResult<Option<ServiceCategory>>;

    async fn create_problem(&self, problem: ServiceProblem) -> StorageResult<ServiceProblem>;

    /// The category's full problem tree, parents before children
    async fn list_problems(&self, category_id: &CategoryId) -> StorageResult<Vec<ServiceProblem>>;

    async fn get_problem(&self, id: &ProblemId) -> StorageResult<Option<ServiceProblem>>;

    async fn create_provider(&self, provider: ServiceProvider) -> StorageResult<ServiceProvider>;

    async fn get_provider(&self, id: &ProviderId) -> StorageResult<Option<ServiceProvider>>;

    async fn get_provider_by_user(&self, user_id: &UserId)
        -> StorageResult<Option<ServiceProvider>>;

    async fn list_providers_by_category(
        &self,
        category_id: &CategoryId,
    ) -> StorageResult<Vec<ServiceProvider>>;
}

/// Storefront menu items
#[async_trait]
pub trait MenuItemStore {
    async fn create_menu_item(&self, item: MenuItem) -> StorageResult<MenuItem>;

    /// Lookup scoped to a category so a cross-category id is simply absent
    async fn get_menu_item(
        &self,
        id: &ItemId,
        category: MenuCategory,
    ) -> StorageResult<Option<MenuItem>>;

    async fn list_menu_items(&self, category: MenuCategory) -> StorageResult<Vec<MenuItem>>;

    async fn list_menu_items_for_provider(
        &self,
        provider_id: &ProviderId,
        category: MenuCategory,
    ) -> StorageResult<Vec<MenuItem>>;

    async fn update_menu_item(
        &self,
        id: &ItemId,
        category: MenuCategory,
        update: MenuItemUpdate,
    ) -> StorageResult<MenuItem>;

    async fn delete_menu_item(&self, id: &ItemId, category: MenuCategory) -> StorageResult<()>;
}

/// The shared grocery catalog
#[async_trait]
pub trait GroceryStore {
    async fn create_product(&self, product: GroceryProduct) -> StorageResult<GroceryProduct>;

    async fn list_products(&self) -> StorageResult<Vec<GroceryProduct>>;

    async fn get_product(&self, id: &ProductId) -> StorageResult<Option<GroceryProduct>>;
}

/// Service bookings
#[async_trait]
pub trait BookingStore {
    async fn create_booking(&self, booking: Booking) -> StorageResult<Booking>;

    async fn get_booking(&self, id: &BookingId) -> StorageResult<Option<Booking>>;

    async fn list_bookings_for_customer(&self, customer_id: &UserId)
        -> StorageResult<Vec<Booking>>;

    async fn list_bookings_for_provider(
        &self,
        provider_id: &ProviderId,
    ) -> StorageResult<Vec<Booking>>;

    /// Unclaimed pending bookings whose problem belongs to the category
    async fn list_pending_for_category(
        &self,
        category_id: &CategoryId,
    ) -> StorageResult<Vec<Booking>>;

    /// Move the booking from `expected` to `next` and apply `patch`, all or
    /// nothing. NotFound when the id is unknown, Conflict when the status
    /// has already moved.
    async fn update_booking_if_status(
        &self,
        id: &BookingId,
        expected: BookingStatus,
        next: BookingStatus,
        patch: BookingPatch,
    ) -> StorageResult<Booking>;
}

/// Invoices and their payment state
#[async_trait]
pub trait InvoiceStore {
    /// Insert the invoice and move its booking from `awaiting_bill` to
    /// `awaiting_payment` in one atomic step. Conflict when the booking
    /// already left `awaiting_bill` or already has an invoice.
    async fn create_invoice_for_booking(&self, invoice: Invoice) -> StorageResult<Invoice>;

    async fn get_invoice(&self, id: &InvoiceId) -> StorageResult<Option<Invoice>>;

    async fn get_invoice_for_booking(&self, booking_id: &BookingId)
        -> StorageResult<Option<Invoice>>;

    async fn set_invoice_gateway_order(
        &self,
        id: &InvoiceId,
        gateway_order_id: &str,
    ) -> StorageResult<Invoice>;

    async fn find_invoice_by_gateway_order(
        &self,
        gateway_order_id: &str,
    ) -> StorageResult<Option<Invoice>>;

    /// Mark the invoice paid and complete its booking. Returns false when
    /// the invoice was already paid, so converging confirmation paths
    /// credit at most once.
    async fn mark_invoice_paid(&self, id: &InvoiceId, payment_id: &str) -> StorageResult<bool>;
}

/// Grocery orders and their payment state
#[async_trait]
pub trait OrderStore {
    async fn create_order(&self, order: Order) -> StorageResult<Order>;

    async fn get_order(&self, id: &OrderId) -> StorageResult<Option<Order>>;

    async fn list_orders_for_customer(&self, customer_id: &UserId) -> StorageResult<Vec<Order>>;

    async fn set_order_gateway_order(
        &self,
        id: &OrderId,
        gateway_order_id: &str,
    ) -> StorageResult<Order>;

    async fn find_order_by_gateway_order(
        &self,
        gateway_order_id: &str,
    ) -> StorageResult<Option<Order>>;

    /// Mark the order paid; false when it already was
    async fn mark_order_paid(&self, id: &OrderId, payment_id: &str) -> StorageResult<bool>;
}

/// Provider reviews
#[async_trait]
pub trait ReviewStore {
    /// Insert the review and fold it into the provider's rating aggregate
    /// in one step
    async fn create_review(&self, review: Review) -> StorageResult<Review>;

    async fn list_reviews_for_provider(
        &self,
        provider_id: &ProviderId,
    ) -> StorageResult<Vec<Review>>;
}

/// Rental listings
#[async_trait]
pub trait RentalStore {
    async fn create_property(&self, property: RentalProperty) -> StorageResult<RentalProperty>;

    async fn list_properties(&self) -> StorageResult<Vec<RentalProperty>>;

    async fn get_property(&self, id: &PropertyId) -> StorageResult<Option<RentalProperty>>;

    async fn delete_property(&self, id: &PropertyId) -> StorageResult<()>;
}

/// Restaurant table bookings
#[async_trait]
pub trait TableStore {
    async fn create_table_booking(&self, booking: TableBooking) -> StorageResult<TableBooking>;

    async fn get_table_booking(&self, id: &TableBookingId) -> StorageResult<Option<TableBooking>>;

    async fn list_table_bookings_for_customer(
        &self,
        customer_id: &UserId,
    ) -> StorageResult<Vec<TableBooking>>;

    async fn list_table_bookings_for_provider(
        &self,
        provider_id: &ProviderId,
    ) -> StorageResult<Vec<TableBooking>>;

    async fn update_table_booking_status(
        &self,
        id: &TableBookingId,
        expected: TableBookingStatus,
        next: TableBookingStatus,
    ) -> StorageResult<TableBooking>;
}

/// Webhook delivery dedupe
#[async_trait]
pub trait PaymentEventStore {
    /// Record a delivery by its dedupe key. True on first sight; false when
    /// the key was already recorded, meaning the side effects already ran.
    async fn record_payment_event(&self, dedupe_key: &str) -> StorageResult<bool>;
}

/// Everything the daemon needs from a backend
pub trait Storage:
    UserStore
    + CatalogStore
    + MenuItemStore
    + GroceryStore
    + BookingStore
    + InvoiceStore
    + OrderStore
    + ReviewStore
    + RentalStore
    + TableStore
    + PaymentEventStore
    + Send
    + Sync
{
}

impl<T> Storage for T where
    T: UserStore
        + CatalogStore
        + MenuItemStore
        + GroceryStore
        + BookingStore
        + InvoiceStore
        + OrderStore
        + ReviewStore
        + RentalStore
        + TableStore
        + PaymentEventStore
        + Send
        + Sync
{
}
