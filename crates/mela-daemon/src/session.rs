//! Server-side sessions and auth extractors
//!
//! Identity lives in a server-side map keyed by an opaque random token; the
//! cookie carries only the token. Handlers receive identity through
//! request-scoped extractors, never through shared mutable globals.

use crate::api::rest::state::AppState;
use crate::error::ApiError;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use mela_types::{Role, ServiceProvider, User, UserId};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

/// Cookie that carries the session token
pub const SESSION_COOKIE: &str = "mela_session";

const TOKEN_LEN: usize = 32;

/// An authenticated session
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user_id: UserId,
    pub role: Role,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

/// In-memory session store with TTL expiry
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Create a session and return it (the token goes into the cookie)
    pub async fn issue(&self, user_id: UserId, role: Role) -> Session {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect();
        let session = Session {
            token: token.clone(),
            user_id,
            role,
            expires_at: chrono::Utc::now()
                + chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::hours(24)),
        };
        self.sessions
            .write()
            .await
            .insert(token, session.clone());
        session
    }

    /// Look up a live session; expired entries are dropped on access
    pub async fn get(&self, token: &str) -> Option<Session> {
        {
            let sessions = self.sessions.read().await;
            match sessions.get(token) {
                Some(s) if s.expires_at > chrono::Utc::now() => return Some(s.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        self.sessions.write().await.remove(token);
        None
    }

    /// Drop a session; true if it existed
    pub async fn revoke(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }
}

/// Pull the session token out of the Cookie header
pub fn cookie_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(COOKIE)?.to_str().ok()?;
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

/// Set-Cookie value establishing a session
pub fn session_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax")
}

/// Set-Cookie value clearing the session
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// The authenticated caller; rejects with 401 when absent or stale
pub struct CurrentUser {
    pub user: User,
    pub session: Session,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let token = cookie_token(&parts.headers)
            .ok_or_else(|| ApiError::Unauthenticated("no session cookie".into()))?;
        let session = state
            .sessions
            .get(&token)
            .await
            .ok_or_else(|| ApiError::Unauthenticated("session expired or unknown".into()))?;
        let user = state
            .storage
            .get_user(&session.user_id)
            .await?
            .ok_or_else(|| ApiError::Unauthenticated("account no longer exists".into()))?;
        Ok(CurrentUser { user, session })
    }
}

/// The authenticated caller plus their provider profile; 403 without one
pub struct ProviderContext {
    pub user: User,
    pub provider: ServiceProvider,
}

#[async_trait]
impl FromRequestParts<AppState> for ProviderContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let current = CurrentUser::from_request_parts(parts, state).await?;
        let provider = state
            .storage
            .get_provider_by_user(&current.user.id)
            .await?
            .ok_or_else(|| ApiError::Forbidden("you are not a service provider".into()))?;
        Ok(ProviderContext {
            user: current.user,
            provider,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[tokio::test]
    async fn test_issue_then_get() {
        let store = SessionStore::new(Duration::from_secs(3600));
        let session = store.issue(UserId::generate(), Role::Customer).await;
        let fetched = store.get(&session.token).await.unwrap();
        assert_eq!(fetched.user_id, session.user_id);
    }

    #[tokio::test]
    async fn test_expired_session_is_gone() {
        let store = SessionStore::new(Duration::from_secs(0));
        let session = store.issue(UserId::generate(), Role::Customer).await;
        assert!(store.get(&session.token).await.is_none());
    }

    #[tokio::test]
    async fn test_revoke() {
        let store = SessionStore::new(Duration::from_secs(3600));
        let session = store.issue(UserId::generate(), Role::Provider).await;
        assert!(store.revoke(&session.token).await);
        assert!(!store.revoke(&session.token).await);
        assert!(store.get(&session.token).await.is_none());
    }

    #[test]
    fn test_cookie_token_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; mela_session=abc123; lang=en"),
        );
        assert_eq!(cookie_token(&headers), Some("abc123".to_string()));

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark"));
        assert_eq!(cookie_token(&headers), None);
    }
}
