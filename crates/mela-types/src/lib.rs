//! Mela Types - Core domain types for the marketplace
//!
//! Mela is a multi-category local-services marketplace: customers book
//! electricians and plumbers through a provider-driven lifecycle, order from
//! storefront menus and the grocery catalog, and list rental properties.
//!
//! ## Architectural Boundaries
//!
//! - **mela-types** owns: the data model, ids, status enums
//! - **mela-lifecycle** owns: which booking transitions are legal and for whom
//! - **mela-daemon** owns: persistence, sessions, and the HTTP surface
//!
//! All monetary amounts are integer minor currency units (paise). Totals are
//! always recomputed server-side from line items, never accepted from a
//! client.

#![deny(unsafe_code)]

pub mod booking;
pub mod catalog;
pub mod ids;
pub mod invoice;
pub mod menu;
pub mod order;
pub mod rental;
pub mod review;
pub mod table;
pub mod user;

// Re-export main types
pub use booking::{Booking, BookingStatus, NewBooking};
pub use catalog::{GroceryProduct, ServiceCategory, ServiceProblem, ServiceProvider};
pub use ids::{
    BookingId, CategoryId, InvoiceId, ItemId, OrderId, ProblemId, ProductId, PropertyId,
    ProviderId, ReviewId, TableBookingId, UserId,
};
pub use invoice::{Invoice, SparePart};
pub use menu::{MenuCategory, MenuItem, UnknownCategory};
pub use order::{Order, OrderLine, OrderStatus};
pub use rental::RentalProperty;
pub use review::Review;
pub use table::{TableBooking, TableBookingStatus};
pub use user::{PublicUser, Role, User};
