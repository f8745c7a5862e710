//! Invoice totalling
//!
//! The provider submits line items; the server computes the total. A
//! client-submitted total is never read, let alone trusted.

use mela_types::SparePart;
use serde::Deserialize;
use thiserror::Error;

/// Upper bound on any single charge, in minor units (1 crore paise)
pub const MAX_PRICE_MINOR: i64 = 10_000_000;

/// Upper bound on itemized charges per invoice
pub const MAX_SPARE_PARTS: usize = 50;

/// What the provider submits when raising the bill
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceDraft {
    #[serde(default)]
    pub spare_parts: Vec<SparePart>,
    pub service_charge_minor: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Why a draft was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvoiceError {
    #[error("spare part name must not be empty")]
    EmptyPartName,

    #[error("price {0} is out of range")]
    PriceOutOfRange(i64),

    #[error("too many spare parts ({0}, max {MAX_SPARE_PARTS})")]
    TooManyParts(usize),
}

/// Validate a draft's line items and charges
pub fn validate_draft(draft: &InvoiceDraft) -> Result<(), InvoiceError> {
    if draft.spare_parts.len() > MAX_SPARE_PARTS {
        return Err(InvoiceError::TooManyParts(draft.spare_parts.len()));
    }
    for part in &draft.spare_parts {
        if part.name.trim().is_empty() {
            return Err(InvoiceError::EmptyPartName);
        }
        if part.price_minor < 0 || part.price_minor > MAX_PRICE_MINOR {
            return Err(InvoiceError::PriceOutOfRange(part.price_minor));
        }
    }
    if draft.service_charge_minor < 0 || draft.service_charge_minor > MAX_PRICE_MINOR {
        return Err(InvoiceError::PriceOutOfRange(draft.service_charge_minor));
    }
    Ok(())
}

/// sum(spare parts) + service charge
///
/// Validated drafts cannot overflow: at most 50 parts capped at
/// [`MAX_PRICE_MINOR`] each.
pub fn total_minor(draft: &InvoiceDraft) -> i64 {
    draft
        .spare_parts
        .iter()
        .map(|p| p.price_minor)
        .sum::<i64>()
        + draft.service_charge_minor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(name: &str, price_minor: i64) -> SparePart {
        SparePart {
            name: name.to_string(),
            price_minor,
        }
    }

    #[test]
    fn test_total_is_parts_plus_service_charge() {
        let draft = InvoiceDraft {
            spare_parts: vec![part("Wire", 5000)],
            service_charge_minor: 20000,
            notes: None,
        };
        assert!(validate_draft(&draft).is_ok());
        assert_eq!(total_minor(&draft), 25000);
    }

    #[test]
    fn test_empty_parts_total_is_service_charge() {
        let draft = InvoiceDraft {
            spare_parts: vec![],
            service_charge_minor: 15000,
            notes: None,
        };
        assert_eq!(total_minor(&draft), 15000);
    }

    #[test]
    fn test_negative_price_rejected() {
        let draft = InvoiceDraft {
            spare_parts: vec![part("Switch", -100)],
            service_charge_minor: 0,
            notes: None,
        };
        assert_eq!(
            validate_draft(&draft),
            Err(InvoiceError::PriceOutOfRange(-100))
        );
    }

    #[test]
    fn test_negative_service_charge_rejected() {
        let draft = InvoiceDraft {
            spare_parts: vec![],
            service_charge_minor: -1,
            notes: None,
        };
        assert!(validate_draft(&draft).is_err());
    }

    #[test]
    fn test_blank_part_name_rejected() {
        let draft = InvoiceDraft {
            spare_parts: vec![part("   ", 100)],
            service_charge_minor: 0,
            notes: None,
        };
        assert_eq!(validate_draft(&draft), Err(InvoiceError::EmptyPartName));
    }

    #[test]
    fn test_part_cap() {
        let draft = InvoiceDraft {
            spare_parts: (0..51).map(|i| part(&format!("p{i}"), 1)).collect(),
            service_charge_minor: 0,
            notes: None,
        };
        assert_eq!(validate_draft(&draft), Err(InvoiceError::TooManyParts(51)));
    }

    fn draft_strategy() -> impl Strategy<Value = InvoiceDraft> {
        (
            proptest::collection::vec(0..=MAX_PRICE_MINOR, 0..=MAX_SPARE_PARTS),
            0..=MAX_PRICE_MINOR,
        )
            .prop_map(|(prices, service_charge_minor)| InvoiceDraft {
                spare_parts: prices
                    .into_iter()
                    .enumerate()
                    .map(|(i, price_minor)| part(&format!("p{i}"), price_minor))
                    .collect(),
                service_charge_minor,
                notes: None,
            })
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn property_valid_drafts_total_in_range(draft in draft_strategy()) {
            prop_assert!(validate_draft(&draft).is_ok());
            let total = total_minor(&draft);
            prop_assert!(total >= 0);
            prop_assert!(total <= (MAX_SPARE_PARTS as i64 + 1) * MAX_PRICE_MINOR);
        }
    }
}
