//! Accounts and roles

use crate::ids::UserId;
use serde::{Deserialize, Serialize};

/// What a session is allowed to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Provider,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Provider => "provider",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "customer" => Some(Role::Customer),
            "provider" => Some(Role::Provider),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Customer
    }
}

/// A registered account
///
/// `password_hash` is a bcrypt hash and must never be serialized into an API
/// response; handlers return [`User::public`] instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,

    /// Unique, stored lowercased
    pub username: String,

    /// Unique
    pub email: String,

    #[serde(skip_serializing)]
    pub password_hash: String,

    pub role: Role,

    /// E.164 phone number, used for booking and OTP SMS
    pub phone: Option<String>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// The client-visible projection of a [`User`]
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub phone: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl User {
    /// Strip credentials for API responses
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
            phone: self.phone.clone(),
            created_at: self.created_at,
        }
    }
}
