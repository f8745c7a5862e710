//! Typed identifiers
//!
//! Every aggregate gets its own UUID newtype so a booking id can never be
//! handed to an order lookup by accident.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random id
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Parse from the canonical hyphenated form
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                Uuid::parse_str(s).map(Self)
            }

            /// The underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

define_id!(
    /// A registered account (customer, provider, or admin)
    UserId
);
define_id!(
    /// A service provider profile
    ProviderId
);
define_id!(
    /// A service category (electrician, beauty, ...)
    CategoryId
);
define_id!(
    /// A node in a category's problem tree
    ProblemId
);
define_id!(
    /// A service booking
    BookingId
);
define_id!(
    /// An invoice raised against a booking
    InvoiceId
);
define_id!(
    /// A catalog purchase order
    OrderId
);
define_id!(
    /// A storefront menu item
    ItemId
);
define_id!(
    /// A grocery catalog product
    ProductId
);
define_id!(
    /// A provider review
    ReviewId
);
define_id!(
    /// A rental property listing
    PropertyId
);
define_id!(
    /// A restaurant table booking
    TableBookingId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip() {
        let id = BookingId::generate();
        let parsed = BookingId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(OrderId::parse("not-a-uuid").is_err());
    }
}
