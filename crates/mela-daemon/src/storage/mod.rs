//! Storage backends
//!
//! One trait per aggregate plus a blanket `Storage` supertrait the rest of
//! the daemon depends on. Two backends: an in-memory store for development
//! and tests, and PostgreSQL for real deployments. Conditional writes on
//! booking and order status go through compare-and-set methods so racing
//! requests lose cleanly instead of clobbering each other.

mod memory;
mod postgres;
pub mod seed;
mod traits;

pub use memory::InMemoryStorage;
pub use postgres::PostgresStorage;
pub use traits::{
    BookingPatch, BookingStore, CatalogStore, GroceryStore, InvoiceStore, MenuItemStore,
    MenuItemUpdate, OrderStore, PaymentEventStore, RentalStore, ReviewStore, Storage,
    StorageResult, TableStore, UserStore,
};
