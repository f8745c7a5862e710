//! Mela daemon library
//!
//! This module provides the core components for the marketplace daemon:
//! - REST API handlers
//! - Session store and auth extractors
//! - Storage backends (in-memory and PostgreSQL)
//! - Server lifecycle management

pub mod api;
pub mod config;
pub mod error;
pub mod pricing;
pub mod server;
pub mod session;
pub mod storage;

pub use config::DaemonConfig;
pub use error::{ApiError, DaemonError, StorageError};
pub use server::Server;
pub use session::SessionStore;
pub use storage::{InMemoryStorage, PostgresStorage, Storage};
