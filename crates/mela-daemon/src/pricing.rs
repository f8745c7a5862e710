//! Server-side fee policy for catalog orders
//!
//! Clients submit product ids and quantities only; unit prices come from the
//! catalog and every fee here is recomputed on the server.

/// Platform fee in basis points of the subtotal (1%)
pub const PLATFORM_FEE_BPS: i64 = 100;

/// Flat delivery fee in minor units
pub const DELIVERY_FEE_MINOR: i64 = 3_000;

/// Delivery is free at or above this subtotal
pub const FREE_DELIVERY_THRESHOLD_MINOR: i64 = 50_000;

/// Upper bound on a menu-item or product price, in minor units
pub const MAX_ITEM_PRICE_MINOR: i64 = 10_000_000;

/// Maximum quantity per order line
pub const MAX_LINE_QUANTITY: u32 = 99;

/// 1% of the subtotal, rounded half-up to the nearest minor unit
pub fn platform_fee_minor(subtotal_minor: i64) -> i64 {
    (subtotal_minor * PLATFORM_FEE_BPS + 5_000) / 10_000
}

/// Flat fee, waived above the free-delivery threshold
pub fn delivery_fee_minor(subtotal_minor: i64) -> i64 {
    if subtotal_minor >= FREE_DELIVERY_THRESHOLD_MINOR {
        0
    } else {
        DELIVERY_FEE_MINOR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_fee_is_one_percent_rounded() {
        assert_eq!(platform_fee_minor(10_000), 100);
        assert_eq!(platform_fee_minor(0), 0);
        // 1% of 49 = 0.49, rounds down; 1% of 50 = 0.50, rounds up
        assert_eq!(platform_fee_minor(49), 0);
        assert_eq!(platform_fee_minor(50), 1);
    }

    #[test]
    fn test_delivery_fee_waived_over_threshold() {
        assert_eq!(delivery_fee_minor(49_999), DELIVERY_FEE_MINOR);
        assert_eq!(delivery_fee_minor(50_000), 0);
        assert_eq!(delivery_fee_minor(120_000), 0);
    }
}
