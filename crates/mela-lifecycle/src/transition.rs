//! The booking transition function
//!
//! The graph is closed: every legal move is listed here and nowhere else.
//! Callers apply the result through a conditional (compare-and-set) storage
//! write, so a race between two conflicting requests leaves exactly one
//! winner.

use mela_types::BookingStatus;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Who is attempting a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    /// The provider assigned to (or accepting) the booking
    Provider,
    /// The customer who created the booking
    Customer,
    Admin,
    /// Payment reconciliation, after a verified signature
    Reconciliation,
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Actor::Provider => "provider",
            Actor::Customer => "customer",
            Actor::Admin => "admin",
            Actor::Reconciliation => "reconciliation",
        };
        f.write_str(s)
    }
}

/// What is being attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingEvent {
    Accept,
    Decline,
    StartJob,
    /// Generate the completion code and enter `awaiting_otp`
    RequestCode,
    /// A correct completion code was submitted
    SubmitCode,
    /// The invoice was created; enter `awaiting_payment`
    SubmitInvoice,
    /// Payment reconciliation verified the signature
    PaymentVerified,
    Cancel,
}

impl fmt::Display for BookingEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BookingEvent::Accept => "accept",
            BookingEvent::Decline => "decline",
            BookingEvent::StartJob => "start_job",
            BookingEvent::RequestCode => "request_code",
            BookingEvent::SubmitCode => "submit_code",
            BookingEvent::SubmitInvoice => "submit_invoice",
            BookingEvent::PaymentVerified => "payment_verified",
            BookingEvent::Cancel => "cancel",
        };
        f.write_str(s)
    }
}

/// Why a transition was refused; the booking is untouched in every case
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("{event} is not allowed while the booking is {status}")]
    InvalidForStatus {
        status: BookingStatus,
        event: BookingEvent,
    },

    #[error("{actor} may not {event}")]
    ActorNotAllowed { actor: Actor, event: BookingEvent },

    #[error("booking is already {0}")]
    Terminal(BookingStatus),
}

/// The full edge list of the lifecycle graph, `(from, event, to)`
pub const EDGES: [(BookingStatus, BookingEvent, BookingStatus); 7] = [
    (
        BookingStatus::Pending,
        BookingEvent::Accept,
        BookingStatus::Accepted,
    ),
    (
        BookingStatus::Pending,
        BookingEvent::Decline,
        BookingStatus::Declined,
    ),
    (
        BookingStatus::Accepted,
        BookingEvent::StartJob,
        BookingStatus::Started,
    ),
    (
        BookingStatus::Started,
        BookingEvent::RequestCode,
        BookingStatus::AwaitingOtp,
    ),
    (
        BookingStatus::AwaitingOtp,
        BookingEvent::SubmitCode,
        BookingStatus::AwaitingBill,
    ),
    (
        BookingStatus::AwaitingBill,
        BookingEvent::SubmitInvoice,
        BookingStatus::AwaitingPayment,
    ),
    (
        BookingStatus::AwaitingPayment,
        BookingEvent::PaymentVerified,
        BookingStatus::Completed,
    ),
];

fn actor_may(actor: Actor, event: BookingEvent) -> bool {
    match event {
        BookingEvent::Accept
        | BookingEvent::Decline
        | BookingEvent::StartJob
        | BookingEvent::RequestCode
        | BookingEvent::SubmitCode
        | BookingEvent::SubmitInvoice => actor == Actor::Provider,
        BookingEvent::PaymentVerified => actor == Actor::Reconciliation,
        BookingEvent::Cancel => matches!(actor, Actor::Customer | Actor::Admin),
    }
}

/// Decide where `event` takes a booking currently in `status`
///
/// Pure; the caller must commit the result with a compare-and-set on
/// `status` to make it stick.
pub fn next_status(
    status: BookingStatus,
    actor: Actor,
    event: BookingEvent,
) -> Result<BookingStatus, TransitionError> {
    if status.is_terminal() {
        return Err(TransitionError::Terminal(status));
    }

    if !actor_may(actor, event) {
        return Err(TransitionError::ActorNotAllowed { actor, event });
    }

    // Cancel is the one edge available from every non-terminal status
    if event == BookingEvent::Cancel {
        return Ok(BookingStatus::Cancelled);
    }

    EDGES
        .iter()
        .find(|(from, e, _)| *from == status && *e == event)
        .map(|(_, _, to)| *to)
        .ok_or(TransitionError::InvalidForStatus { status, event })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATUSES: [BookingStatus; 9] = [
        BookingStatus::Pending,
        BookingStatus::Accepted,
        BookingStatus::Declined,
        BookingStatus::Started,
        BookingStatus::AwaitingOtp,
        BookingStatus::AwaitingBill,
        BookingStatus::AwaitingPayment,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    const ALL_EVENTS: [BookingEvent; 8] = [
        BookingEvent::Accept,
        BookingEvent::Decline,
        BookingEvent::StartJob,
        BookingEvent::RequestCode,
        BookingEvent::SubmitCode,
        BookingEvent::SubmitInvoice,
        BookingEvent::PaymentVerified,
        BookingEvent::Cancel,
    ];

    #[test]
    fn test_happy_path() {
        let mut status = BookingStatus::Pending;
        for (event, expected) in [
            (BookingEvent::Accept, BookingStatus::Accepted),
            (BookingEvent::StartJob, BookingStatus::Started),
            (BookingEvent::RequestCode, BookingStatus::AwaitingOtp),
            (BookingEvent::SubmitCode, BookingStatus::AwaitingBill),
            (BookingEvent::SubmitInvoice, BookingStatus::AwaitingPayment),
        ] {
            status = next_status(status, Actor::Provider, event).unwrap();
            assert_eq!(status, expected);
        }
        let done = next_status(status, Actor::Reconciliation, BookingEvent::PaymentVerified);
        assert_eq!(done, Ok(BookingStatus::Completed));
    }

    #[test]
    fn test_decline_from_pending_only() {
        assert_eq!(
            next_status(BookingStatus::Pending, Actor::Provider, BookingEvent::Decline),
            Ok(BookingStatus::Declined)
        );
        for status in [
            BookingStatus::Accepted,
            BookingStatus::Started,
            BookingStatus::AwaitingOtp,
            BookingStatus::AwaitingBill,
            BookingStatus::AwaitingPayment,
        ] {
            assert!(matches!(
                next_status(status, Actor::Provider, BookingEvent::Decline),
                Err(TransitionError::InvalidForStatus { .. })
            ));
        }
    }

    #[test]
    fn test_no_reverse_or_skip_edges() {
        // awaiting_payment can only complete or cancel
        for event in [
            BookingEvent::Accept,
            BookingEvent::StartJob,
            BookingEvent::RequestCode,
            BookingEvent::SubmitCode,
            BookingEvent::SubmitInvoice,
        ] {
            assert!(next_status(BookingStatus::AwaitingPayment, Actor::Provider, event).is_err());
        }
        // pending cannot skip ahead
        for event in [
            BookingEvent::StartJob,
            BookingEvent::RequestCode,
            BookingEvent::SubmitCode,
            BookingEvent::SubmitInvoice,
        ] {
            assert!(next_status(BookingStatus::Pending, Actor::Provider, event).is_err());
        }
    }

    #[test]
    fn test_terminal_statuses_are_sinks() {
        for status in [
            BookingStatus::Declined,
            BookingStatus::Cancelled,
            BookingStatus::Completed,
        ] {
            for actor in [Actor::Provider, Actor::Customer, Actor::Admin, Actor::Reconciliation] {
                for event in ALL_EVENTS {
                    assert_eq!(
                        next_status(status, actor, event),
                        Err(TransitionError::Terminal(status))
                    );
                }
            }
        }
    }

    #[test]
    fn test_cancel_from_any_non_terminal() {
        for status in ALL_STATUSES.iter().filter(|s| !s.is_terminal()) {
            assert_eq!(
                next_status(*status, Actor::Customer, BookingEvent::Cancel),
                Ok(BookingStatus::Cancelled)
            );
            assert_eq!(
                next_status(*status, Actor::Admin, BookingEvent::Cancel),
                Ok(BookingStatus::Cancelled)
            );
        }
    }

    #[test]
    fn test_actor_permissions() {
        // customers cannot drive the provider-side flow
        assert!(matches!(
            next_status(BookingStatus::Pending, Actor::Customer, BookingEvent::Accept),
            Err(TransitionError::ActorNotAllowed { .. })
        ));
        // providers cannot cancel or complete payment
        assert!(matches!(
            next_status(BookingStatus::Started, Actor::Provider, BookingEvent::Cancel),
            Err(TransitionError::ActorNotAllowed { .. })
        ));
        assert!(matches!(
            next_status(
                BookingStatus::AwaitingPayment,
                Actor::Provider,
                BookingEvent::PaymentVerified
            ),
            Err(TransitionError::ActorNotAllowed { .. })
        ));
    }

    use proptest::prelude::*;

    fn step_strategy() -> impl Strategy<Value = (Actor, BookingEvent)> {
        (
            prop_oneof![
                Just(Actor::Provider),
                Just(Actor::Customer),
                Just(Actor::Admin),
                Just(Actor::Reconciliation),
            ],
            proptest::sample::select(ALL_EVENTS.to_vec()),
        )
    }

    proptest! {
        // A terminal status, once reached, is never left, whatever the
        // remaining requests are
        #[test]
        fn property_terminal_statuses_stay_terminal(
            steps in proptest::collection::vec(step_strategy(), 0..24)
        ) {
            let mut status = BookingStatus::Pending;
            for (actor, event) in steps {
                let was_terminal = status.is_terminal();
                match next_status(status, actor, event) {
                    Ok(next) => {
                        prop_assert!(!was_terminal);
                        status = next;
                    }
                    Err(_) => {}
                }
                if was_terminal {
                    prop_assert!(status.is_terminal());
                }
            }
        }
    }

    #[test]
    fn test_every_accepted_move_is_a_listed_edge() {
        for from in ALL_STATUSES {
            for actor in [Actor::Provider, Actor::Customer, Actor::Admin, Actor::Reconciliation] {
                for event in ALL_EVENTS {
                    if let Ok(to) = next_status(from, actor, event) {
                        let listed = EDGES.iter().any(|(f, e, t)| (*f, *e, *t) == (from, event, to))
                            || (event == BookingEvent::Cancel && to == BookingStatus::Cancelled);
                        assert!(listed, "unlisted edge {from} --{event}--> {to}");
                    }
                }
            }
        }
    }
}
