//! Request handlers, grouped by resource

pub mod auth;
pub mod bookings;
pub mod catalog;
pub mod health;
pub mod menu;
pub mod orders;
pub mod payments;
pub mod rentals;
pub mod reviews;
pub mod tables;
