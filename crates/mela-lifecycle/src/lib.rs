//! Mela Lifecycle - the booking state machine
//!
//! The one piece of this system with real design content: which booking
//! transitions are legal, for whom, and what the completion-code handshake
//! and invoice totalling must guarantee.
//!
//! Everything here is pure. Persistence (and the compare-and-set that makes
//! concurrent transitions safe) belongs to the daemon's storage layer; this
//! crate only answers "may actor A move this booking from S with event E,
//! and where does it land".
//!
//! ## Key Concepts
//!
//! - **BookingEvent**: what someone is trying to do (accept, start, cancel)
//! - **Actor**: who is doing it (provider, customer, admin, reconciliation)
//! - **next_status**: the transition function over the fixed graph
//! - **ServiceCode**: the single-use 6-digit completion code
//! - **InvoiceDraft**: provider-submitted charges, totalled server-side

#![deny(unsafe_code)]

pub mod code;
pub mod invoice;
pub mod transition;

pub use code::{generate_code, is_well_formed, verify_code, CodeError, CODE_LEN};
pub use invoice::{total_minor, validate_draft, InvoiceDraft, InvoiceError, MAX_PRICE_MINOR};
pub use transition::{next_status, Actor, BookingEvent, TransitionError};
