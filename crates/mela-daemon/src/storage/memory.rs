//! In-memory storage backend
//!
//! A single `RwLock` over every table. Combined writes such as "insert the
//! invoice and advance the booking" hold the one write guard for their whole
//! span, which is what makes the compare-and-set semantics exact here.

use super::traits::*;
use crate::error::StorageError;
use async_trait::async_trait;
use mela_types::{
    Booking, BookingId, BookingStatus, CategoryId, GroceryProduct, Invoice, InvoiceId, ItemId,
    MenuCategory, MenuItem, Order, OrderId, OrderStatus, ProblemId, ProductId, PropertyId,
    ProviderId, RentalProperty, Review, ServiceCategory, ServiceProblem, ServiceProvider,
    TableBooking, TableBookingId, TableBookingStatus, User, UserId,
};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

#[derive(Default)]
struct MemoryInner {
    users: HashMap<UserId, User>,
    categories: HashMap<CategoryId, ServiceCategory>,
    problems: HashMap<ProblemId, ServiceProblem>,
    providers: HashMap<ProviderId, ServiceProvider>,
    menu_items: HashMap<ItemId, MenuItem>,
    products: HashMap<ProductId, GroceryProduct>,
    bookings: HashMap<BookingId, Booking>,
    invoices: HashMap<InvoiceId, Invoice>,
    orders: HashMap<OrderId, Order>,
    reviews: HashMap<mela_types::ReviewId, Review>,
    properties: HashMap<PropertyId, RentalProperty>,
    table_bookings: HashMap<TableBookingId, TableBooking>,
    payment_events: HashSet<String>,
}

/// In-memory storage for development and tests
#[derive(Default)]
pub struct InMemoryStorage {
    inner: RwLock<MemoryInner>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryStorage {
    async fn create_user(&self, user: User) -> StorageResult<User> {
        let mut inner = self.inner.write().await;
        if inner
            .users
            .values()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(StorageError::Conflict(format!(
                "username or email already registered: {}",
                user.username
            )));
        }
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: &UserId) -> StorageResult<Option<User>> {
        Ok(self.inner.read().await.users.get(id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> StorageResult<Option<User>> {
        Ok(self
            .inner
            .read()
            .await
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }
}

#[async_trait]
impl CatalogStore for InMemoryStorage {
    async fn create_category(&self, category: ServiceCategory) -> StorageResult<ServiceCategory> {
        let mut inner = self.inner.write().await;
        if inner.categories.values().any(|c| c.slug == category.slug) {
            return Err(StorageError::Conflict(format!(
                "category slug taken: {}",
                category.slug
            )));
        }
        inner.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn list_categories(&self) -> StorageResult<Vec<ServiceCategory>> {
        let inner = self.inner.read().await;
        let mut categories: Vec<_> = inner.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn get_category_by_slug(&self, slug: &str) -> StorageResult<Option<ServiceCategory>> {
        Ok(self
            .inner
            .read()
            .await
            .categories
            .values()
            .find(|c| c.slug == slug)
            .cloned())
    }

    async fn create_problem(&self, problem: ServiceProblem) -> StorageResult<ServiceProblem> {
        let mut inner = self.inner.write().await;
        if !inner.categories.contains_key(&problem.category_id) {
            return Err(StorageError::NotFound(format!(
                "category: {}",
                problem.category_id
            )));
        }
        inner.problems.insert(problem.id, problem.clone());
        Ok(problem)
    }

    async fn list_problems(&self, category_id: &CategoryId) -> StorageResult<Vec<ServiceProblem>> {
        let inner = self.inner.read().await;
        let mut problems: Vec<_> = inner
            .problems
            .values()
            .filter(|p| p.category_id == *category_id)
            .cloned()
            .collect();
        // Parents first, then by title for a stable tree
        problems.sort_by(|a, b| {
            a.parent_id
                .is_some()
                .cmp(&b.parent_id.is_some())
                .then_with(|| a.title.cmp(&b.title))
        });
        Ok(problems)
    }

    async fn get_problem(&self, id: &ProblemId) -> StorageResult<Option<ServiceProblem>> {
        Ok(self.inner.read().await.problems.get(id).cloned())
    }

    async fn create_provider(&self, provider: ServiceProvider) -> StorageResult<ServiceProvider> {
        let mut inner = self.inner.write().await;
        if inner
            .providers
            .values()
            .any(|p| p.user_id == provider.user_id)
        {
            return Err(StorageError::Conflict(format!(
                "user already has a provider profile: {}",
                provider.user_id
            )));
        }
        inner.providers.insert(provider.id, provider.clone());
        Ok(provider)
    }

    async fn get_provider(&self, id: &ProviderId) -> StorageResult<Option<ServiceProvider>> {
        Ok(self.inner.read().await.providers.get(id).cloned())
    }

    async fn get_provider_by_user(
        &self,
        user_id: &UserId,
    ) -> StorageResult<Option<ServiceProvider>> {
        Ok(self
            .inner
            .read()
            .await
            .providers
            .values()
            .find(|p| p.user_id == *user_id)
            .cloned())
    }

    async fn list_providers_by_category(
        &self,
        category_id: &CategoryId,
    ) -> StorageResult<Vec<ServiceProvider>> {
        let inner = self.inner.read().await;
        let mut providers: Vec<_> = inner
            .providers
            .values()
            .filter(|p| p.category_id == *category_id)
            .cloned()
            .collect();
        providers.sort_by(|a, b| b.rating_hundredths.cmp(&a.rating_hundredths));
        Ok(providers)
    }
}

#[async_trait]
impl MenuItemStore for InMemoryStorage {
    async fn create_menu_item(&self, item: MenuItem) -> StorageResult<MenuItem> {
        let mut inner = self.inner.write().await;
        inner.menu_items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn get_menu_item(
        &self,
        id: &ItemId,
        category: MenuCategory,
    ) -> StorageResult<Option<MenuItem>> {
        Ok(self
            .inner
            .read()
            .await
            .menu_items
            .get(id)
            .filter(|i| i.category == category)
            .cloned())
    }

    async fn list_menu_items(&self, category: MenuCategory) -> StorageResult<Vec<MenuItem>> {
        let inner = self.inner.read().await;
        let mut items: Vec<_> = inner
            .menu_items
            .values()
            .filter(|i| i.category == category)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn list_menu_items_for_provider(
        &self,
        provider_id: &ProviderId,
        category: MenuCategory,
    ) -> StorageResult<Vec<MenuItem>> {
        let inner = self.inner.read().await;
        let mut items: Vec<_> = inner
            .menu_items
            .values()
            .filter(|i| i.category == category && i.provider_id == *provider_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn update_menu_item(
        &self,
        id: &ItemId,
        category: MenuCategory,
        update: MenuItemUpdate,
    ) -> StorageResult<MenuItem> {
        let mut inner = self.inner.write().await;
        let item = inner
            .menu_items
            .get_mut(id)
            .filter(|i| i.category == category)
            .ok_or_else(|| StorageError::NotFound(format!("menu item: {id}")))?;
        if let Some(name) = update.name {
            item.name = name;
        }
        if let Some(description) = update.description {
            item.description = Some(description);
        }
        if let Some(price) = update.price_minor {
            item.price_minor = price;
        }
        if let Some(available) = update.available {
            item.available = available;
        }
        Ok(item.clone())
    }

    async fn delete_menu_item(&self, id: &ItemId, category: MenuCategory) -> StorageResult<()> {
        let mut inner = self.inner.write().await;
        match inner.menu_items.get(id) {
            Some(item) if item.category == category => {
                inner.menu_items.remove(id);
                Ok(())
            }
            _ => Err(StorageError::NotFound(format!("menu item: {id}"))),
        }
    }
}

#[async_trait]
impl GroceryStore for InMemoryStorage {
    async fn create_product(&self, product: GroceryProduct) -> StorageResult<GroceryProduct> {
        let mut inner = self.inner.write().await;
        inner.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn list_products(&self) -> StorageResult<Vec<GroceryProduct>> {
        let inner = self.inner.read().await;
        let mut products: Vec<_> = inner.products.values().cloned().collect();
        products.sort_by(|a, b| (&a.category, &a.name).cmp(&(&b.category, &b.name)));
        Ok(products)
    }

    async fn get_product(&self, id: &ProductId) -> StorageResult<Option<GroceryProduct>> {
        Ok(self.inner.read().await.products.get(id).cloned())
    }
}

#[async_trait]
impl BookingStore for InMemoryStorage {
    async fn create_booking(&self, booking: Booking) -> StorageResult<Booking> {
        let mut inner = self.inner.write().await;
        if !inner.problems.contains_key(&booking.problem_id) {
            return Err(StorageError::NotFound(format!(
                "problem: {}",
                booking.problem_id
            )));
        }
        inner.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn get_booking(&self, id: &BookingId) -> StorageResult<Option<Booking>> {
        Ok(self.inner.read().await.bookings.get(id).cloned())
    }

    async fn list_bookings_for_customer(
        &self,
        customer_id: &UserId,
    ) -> StorageResult<Vec<Booking>> {
        let inner = self.inner.read().await;
        let mut bookings: Vec<_> = inner
            .bookings
            .values()
            .filter(|b| b.customer_id == *customer_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn list_bookings_for_provider(
        &self,
        provider_id: &ProviderId,
    ) -> StorageResult<Vec<Booking>> {
        let inner = self.inner.read().await;
        let mut bookings: Vec<_> = inner
            .bookings
            .values()
            .filter(|b| b.provider_id == Some(*provider_id))
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn list_pending_for_category(
        &self,
        category_id: &CategoryId,
    ) -> StorageResult<Vec<Booking>> {
        let inner = self.inner.read().await;
        let mut bookings: Vec<_> = inner
            .bookings
            .values()
            .filter(|b| {
                b.status == BookingStatus::Pending
                    && b.provider_id.is_none()
                    && inner
                        .problems
                        .get(&b.problem_id)
                        .is_some_and(|p| p.category_id == *category_id)
            })
            .cloned()
            .collect();
        bookings.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(bookings)
    }

    async fn update_booking_if_status(
        &self,
        id: &BookingId,
        expected: BookingStatus,
        next: BookingStatus,
        patch: BookingPatch,
    ) -> StorageResult<Booking> {
        let mut inner = self.inner.write().await;
        let booking = inner
            .bookings
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(format!("booking: {id}")))?;
        if booking.status != expected {
            return Err(StorageError::Conflict(format!(
                "booking {id} is {}, expected {expected}",
                booking.status
            )));
        }
        booking.status = next;
        if let Some(provider_id) = patch.provider_id {
            booking.provider_id = Some(provider_id);
        }
        if let Some(code) = patch.service_code {
            booking.service_code = code;
        }
        booking.updated_at = chrono::Utc::now();
        Ok(booking.clone())
    }
}

#[async_trait]
impl InvoiceStore for InMemoryStorage {
    async fn create_invoice_for_booking(&self, invoice: Invoice) -> StorageResult<Invoice> {
        let mut inner = self.inner.write().await;
        if inner
            .invoices
            .values()
            .any(|i| i.booking_id == invoice.booking_id)
        {
            return Err(StorageError::Conflict(format!(
                "booking already invoiced: {}",
                invoice.booking_id
            )));
        }
        let booking = inner
            .bookings
            .get_mut(&invoice.booking_id)
            .ok_or_else(|| StorageError::NotFound(format!("booking: {}", invoice.booking_id)))?;
        if booking.status != BookingStatus::AwaitingBill {
            return Err(StorageError::Conflict(format!(
                "booking {} is {}, expected awaiting_bill",
                invoice.booking_id, booking.status
            )));
        }
        booking.status = BookingStatus::AwaitingPayment;
        booking.updated_at = chrono::Utc::now();
        inner.invoices.insert(invoice.id, invoice.clone());
        Ok(invoice)
    }

    async fn get_invoice(&self, id: &InvoiceId) -> StorageResult<Option<Invoice>> {
        Ok(self.inner.read().await.invoices.get(id).cloned())
    }

    async fn get_invoice_for_booking(
        &self,
        booking_id: &BookingId,
    ) -> StorageResult<Option<Invoice>> {
        Ok(self
            .inner
            .read()
            .await
            .invoices
            .values()
            .find(|i| i.booking_id == *booking_id)
            .cloned())
    }

    async fn set_invoice_gateway_order(
        &self,
        id: &InvoiceId,
        gateway_order_id: &str,
    ) -> StorageResult<Invoice> {
        let mut inner = self.inner.write().await;
        let invoice = inner
            .invoices
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(format!("invoice: {id}")))?;
        invoice.gateway_order_id = Some(gateway_order_id.to_string());
        Ok(invoice.clone())
    }

    async fn find_invoice_by_gateway_order(
        &self,
        gateway_order_id: &str,
    ) -> StorageResult<Option<Invoice>> {
        Ok(self
            .inner
            .read()
            .await
            .invoices
            .values()
            .find(|i| i.gateway_order_id.as_deref() == Some(gateway_order_id))
            .cloned())
    }

    async fn mark_invoice_paid(&self, id: &InvoiceId, payment_id: &str) -> StorageResult<bool> {
        let mut inner = self.inner.write().await;
        let invoice = inner
            .invoices
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(format!("invoice: {id}")))?;
        if invoice.paid {
            return Ok(false);
        }
        invoice.paid = true;
        invoice.payment_id = Some(payment_id.to_string());
        let booking_id = invoice.booking_id;
        if let Some(booking) = inner.bookings.get_mut(&booking_id) {
            if booking.status == BookingStatus::AwaitingPayment {
                booking.status = BookingStatus::Completed;
                booking.updated_at = chrono::Utc::now();
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl OrderStore for InMemoryStorage {
    async fn create_order(&self, order: Order) -> StorageResult<Order> {
        let mut inner = self.inner.write().await;
        inner.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: &OrderId) -> StorageResult<Option<Order>> {
        Ok(self.inner.read().await.orders.get(id).cloned())
    }

    async fn list_orders_for_customer(&self, customer_id: &UserId) -> StorageResult<Vec<Order>> {
        let inner = self.inner.read().await;
        let mut orders: Vec<_> = inner
            .orders
            .values()
            .filter(|o| o.customer_id == *customer_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn set_order_gateway_order(
        &self,
        id: &OrderId,
        gateway_order_id: &str,
    ) -> StorageResult<Order> {
        let mut inner = self.inner.write().await;
        let order = inner
            .orders
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(format!("order: {id}")))?;
        order.gateway_order_id = Some(gateway_order_id.to_string());
        Ok(order.clone())
    }

    async fn find_order_by_gateway_order(
        &self,
        gateway_order_id: &str,
    ) -> StorageResult<Option<Order>> {
        Ok(self
            .inner
            .read()
            .await
            .orders
            .values()
            .find(|o| o.gateway_order_id.as_deref() == Some(gateway_order_id))
            .cloned())
    }

    async fn mark_order_paid(&self, id: &OrderId, payment_id: &str) -> StorageResult<bool> {
        let mut inner = self.inner.write().await;
        let order = inner
            .orders
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(format!("order: {id}")))?;
        if order.status == OrderStatus::Paid {
            return Ok(false);
        }
        order.status = OrderStatus::Paid;
        order.payment_id = Some(payment_id.to_string());
        Ok(true)
    }
}

#[async_trait]
impl ReviewStore for InMemoryStorage {
    async fn create_review(&self, review: Review) -> StorageResult<Review> {
        let mut inner = self.inner.write().await;
        let provider = inner
            .providers
            .get_mut(&review.provider_id)
            .ok_or_else(|| StorageError::NotFound(format!("provider: {}", review.provider_id)))?;
        let new_count = provider.review_count + 1;
        let total = u64::from(provider.rating_hundredths) * u64::from(provider.review_count)
            + u64::from(review.rating) * 100;
        provider.rating_hundredths = (total / u64::from(new_count)) as u32;
        provider.review_count = new_count;
        inner.reviews.insert(review.id, review.clone());
        Ok(review)
    }

    async fn list_reviews_for_provider(
        &self,
        provider_id: &ProviderId,
    ) -> StorageResult<Vec<Review>> {
        let inner = self.inner.read().await;
        let mut reviews: Vec<_> = inner
            .reviews
            .values()
            .filter(|r| r.provider_id == *provider_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }
}

#[async_trait]
impl RentalStore for InMemoryStorage {
    async fn create_property(&self, property: RentalProperty) -> StorageResult<RentalProperty> {
        let mut inner = self.inner.write().await;
        inner.properties.insert(property.id, property.clone());
        Ok(property)
    }

    async fn list_properties(&self) -> StorageResult<Vec<RentalProperty>> {
        let inner = self.inner.read().await;
        let mut properties: Vec<_> = inner.properties.values().cloned().collect();
        properties.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(properties)
    }

    async fn get_property(&self, id: &PropertyId) -> StorageResult<Option<RentalProperty>> {
        Ok(self.inner.read().await.properties.get(id).cloned())
    }

    async fn delete_property(&self, id: &PropertyId) -> StorageResult<()> {
        let mut inner = self.inner.write().await;
        inner
            .properties
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(format!("property: {id}")))
    }
}

#[async_trait]
impl TableStore for InMemoryStorage {
    async fn create_table_booking(&self, booking: TableBooking) -> StorageResult<TableBooking> {
        let mut inner = self.inner.write().await;
        if !inner.providers.contains_key(&booking.provider_id) {
            return Err(StorageError::NotFound(format!(
                "provider: {}",
                booking.provider_id
            )));
        }
        inner.table_bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn get_table_booking(&self, id: &TableBookingId) -> StorageResult<Option<TableBooking>> {
        Ok(self.inner.read().await.table_bookings.get(id).cloned())
    }

    async fn list_table_bookings_for_customer(
        &self,
        customer_id: &UserId,
    ) -> StorageResult<Vec<TableBooking>> {
        let inner = self.inner.read().await;
        let mut bookings: Vec<_> = inner
            .table_bookings
            .values()
            .filter(|b| b.customer_id == *customer_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn list_table_bookings_for_provider(
        &self,
        provider_id: &ProviderId,
    ) -> StorageResult<Vec<TableBooking>> {
        let inner = self.inner.read().await;
        let mut bookings: Vec<_> = inner
            .table_bookings
            .values()
            .filter(|b| b.provider_id == *provider_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn update_table_booking_status(
        &self,
        id: &TableBookingId,
        expected: TableBookingStatus,
        next: TableBookingStatus,
    ) -> StorageResult<TableBooking> {
        let mut inner = self.inner.write().await;
        let booking = inner
            .table_bookings
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(format!("table booking: {id}")))?;
        if booking.status != expected {
            return Err(StorageError::Conflict(format!(
                "table booking {id} is {}, expected {expected}",
                booking.status
            )));
        }
        booking.status = next;
        Ok(booking.clone())
    }
}

#[async_trait]
impl PaymentEventStore for InMemoryStorage {
    async fn record_payment_event(&self, dedupe_key: &str) -> StorageResult<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.payment_events.insert(dedupe_key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mela_types::NewBooking;

    fn booking_for(storage_problem: ProblemId) -> Booking {
        Booking::create(
            UserId::generate(),
            NewBooking {
                problem_id: storage_problem,
                scheduled_at: None,
                preferred_slots: vec![],
                address: "4 Brigade Road".into(),
                phone: "+919812345678".into(),
                notes: None,
            },
        )
    }

    async fn seed_problem(storage: &InMemoryStorage) -> ServiceProblem {
        let category = storage
            .create_category(ServiceCategory {
                id: CategoryId::generate(),
                name: "Electrician".into(),
                slug: "electrician".into(),
                description: None,
            })
            .await
            .unwrap();
        storage
            .create_problem(ServiceProblem {
                id: ProblemId::generate(),
                category_id: category.id,
                parent_id: None,
                title: "Fan not working".into(),
                description: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let storage = InMemoryStorage::new();
        let make = |id| User {
            id,
            username: "ravi".into(),
            email: "ravi@example.com".into(),
            password_hash: "h".into(),
            role: mela_types::Role::Customer,
            phone: None,
            created_at: chrono::Utc::now(),
        };
        storage.create_user(make(UserId::generate())).await.unwrap();
        let err = storage
            .create_user(make(UserId::generate()))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_booking_cas_only_one_winner() {
        let storage = InMemoryStorage::new();
        let problem = seed_problem(&storage).await;
        let booking = storage
            .create_booking(booking_for(problem.id))
            .await
            .unwrap();

        let accept = storage.update_booking_if_status(
            &booking.id,
            BookingStatus::Pending,
            BookingStatus::Accepted,
            BookingPatch {
                provider_id: Some(ProviderId::generate()),
                ..Default::default()
            },
        );
        let decline = storage.update_booking_if_status(
            &booking.id,
            BookingStatus::Pending,
            BookingStatus::Declined,
            BookingPatch::default(),
        );
        let (a, d) = tokio::join!(accept, decline);
        assert!(
            a.is_ok() != d.is_ok(),
            "exactly one of the racing writes must win"
        );
        let final_status = storage.get_booking(&booking.id).await.unwrap().unwrap().status;
        assert!(matches!(
            final_status,
            BookingStatus::Accepted | BookingStatus::Declined
        ));
    }

    #[tokio::test]
    async fn test_invoice_requires_awaiting_bill() {
        let storage = InMemoryStorage::new();
        let problem = seed_problem(&storage).await;
        let booking = storage
            .create_booking(booking_for(problem.id))
            .await
            .unwrap();

        let invoice = Invoice {
            id: InvoiceId::generate(),
            booking_id: booking.id,
            spare_parts: vec![],
            service_charge_minor: 20_000,
            notes: None,
            total_minor: 20_000,
            gateway_order_id: None,
            payment_id: None,
            paid: false,
            created_at: chrono::Utc::now(),
        };
        let err = storage
            .create_invoice_for_booking(invoice.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_mark_invoice_paid_is_idempotent() {
        let storage = InMemoryStorage::new();
        let problem = seed_problem(&storage).await;
        let mut booking = storage
            .create_booking(booking_for(problem.id))
            .await
            .unwrap();
        // Walk the booking to awaiting_bill so the invoice insert is legal
        for (expected, next) in [
            (BookingStatus::Pending, BookingStatus::Accepted),
            (BookingStatus::Accepted, BookingStatus::Started),
            (BookingStatus::Started, BookingStatus::AwaitingOtp),
            (BookingStatus::AwaitingOtp, BookingStatus::AwaitingBill),
        ] {
            booking = storage
                .update_booking_if_status(&booking.id, expected, next, BookingPatch::default())
                .await
                .unwrap();
        }

        let invoice = storage
            .create_invoice_for_booking(Invoice {
                id: InvoiceId::generate(),
                booking_id: booking.id,
                spare_parts: vec![],
                service_charge_minor: 20_000,
                notes: None,
                total_minor: 20_000,
                gateway_order_id: None,
                payment_id: None,
                paid: false,
                created_at: chrono::Utc::now(),
            })
            .await
            .unwrap();

        assert!(storage.mark_invoice_paid(&invoice.id, "pay_1").await.unwrap());
        assert!(!storage.mark_invoice_paid(&invoice.id, "pay_2").await.unwrap());

        let booking = storage.get_booking(&booking.id).await.unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::Completed);
        let invoice = storage.get_invoice(&invoice.id).await.unwrap().unwrap();
        assert_eq!(invoice.payment_id.as_deref(), Some("pay_1"));
    }

    #[tokio::test]
    async fn test_review_updates_provider_aggregate() {
        let storage = InMemoryStorage::new();
        let category = storage
            .create_category(ServiceCategory {
                id: CategoryId::generate(),
                name: "Plumber".into(),
                slug: "plumber".into(),
                description: None,
            })
            .await
            .unwrap();
        let provider = storage
            .create_provider(ServiceProvider {
                id: ProviderId::generate(),
                user_id: UserId::generate(),
                category_id: category.id,
                business_name: "Sharma Plumbing".into(),
                description: None,
                experience_years: Some(6),
                address: None,
                rating_hundredths: 0,
                review_count: 0,
                created_at: chrono::Utc::now(),
            })
            .await
            .unwrap();

        for rating in [5u8, 4] {
            storage
                .create_review(Review {
                    id: mela_types::ReviewId::generate(),
                    customer_id: UserId::generate(),
                    provider_id: provider.id,
                    booking_id: None,
                    rating,
                    comment: None,
                    created_at: chrono::Utc::now(),
                })
                .await
                .unwrap();
        }

        let provider = storage.get_provider(&provider.id).await.unwrap().unwrap();
        assert_eq!(provider.review_count, 2);
        assert_eq!(provider.rating_hundredths, 450);
    }

    #[tokio::test]
    async fn test_payment_event_first_wins() {
        let storage = InMemoryStorage::new();
        assert!(storage.record_payment_event("evt_1").await.unwrap());
        assert!(!storage.record_payment_event("evt_1").await.unwrap());
        assert!(storage.record_payment_event("evt_2").await.unwrap());
    }
}
