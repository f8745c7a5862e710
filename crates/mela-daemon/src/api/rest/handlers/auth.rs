//! Signup, login, logout, whoami

use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::session::{clear_session_cookie, session_cookie, CurrentUser};
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::{AppendHeaders, IntoResponse, Response};
use axum::Json;
use mela_types::{Role, User, UserId};
use serde::Deserialize;

// A valid hash of an unguessable string, verified against unknown usernames
// so login latency does not reveal whether an account exists.
const DUMMY_HASH: &str = "$2y$12$R9h/cIPz0gi.URNNX3kh2OPST9/PgBkqquzi.Ss7KIUgO2t0jWMUW";

#[derive(Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<Response> {
    let username = req.username.trim().to_lowercase();
    if username.len() < 3 {
        return Err(ApiError::Validation(
            "username must be at least 3 characters".into(),
        ));
    }
    if !req.email.contains('@') {
        return Err(ApiError::Validation("invalid email".into()));
    }
    if req.password.len() < 6 {
        return Err(ApiError::Validation(
            "password must be at least 6 characters".into(),
        ));
    }
    let role = req.role.unwrap_or(Role::Customer);
    if role == Role::Admin {
        return Err(ApiError::Forbidden("cannot self-register as admin".into()));
    }

    let password_hash = bcrypt::hash(&req.password, bcrypt::DEFAULT_COST)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let user = state
        .storage
        .create_user(User {
            id: UserId::generate(),
            username,
            email: req.email.trim().to_string(),
            password_hash,
            role,
            phone: req.phone,
            created_at: chrono::Utc::now(),
        })
        .await?;

    let session = state.sessions.issue(user.id, user.role).await;
    tracing::info!(user_id = %user.id, role = %user.role.as_str(), "account created");

    Ok((
        StatusCode::CREATED,
        AppendHeaders([(SET_COOKIE, session_cookie(&session.token))]),
        Json(user.public()),
    )
        .into_response())
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Response> {
    let username = req.username.trim().to_lowercase();
    let user = state.storage.get_user_by_username(&username).await?;

    let verified = match &user {
        Some(user) => bcrypt::verify(&req.password, &user.password_hash)
            .map_err(|e| ApiError::Internal(e.to_string()))?,
        None => {
            // Burn the same bcrypt work for unknown accounts
            let _ = bcrypt::verify(&req.password, DUMMY_HASH);
            false
        }
    };

    let Some(user) = user.filter(|_| verified) else {
        return Err(ApiError::Unauthenticated(
            "invalid username or password".into(),
        ));
    };

    let session = state.sessions.issue(user.id, user.role).await;
    tracing::info!(user_id = %user.id, "login");

    Ok((
        AppendHeaders([(SET_COOKIE, session_cookie(&session.token))]),
        Json(user.public()),
    )
        .into_response())
}

pub async fn logout(State(state): State<AppState>, current: CurrentUser) -> Response {
    state.sessions.revoke(&current.session.token).await;
    (
        AppendHeaders([(SET_COOKIE, clear_session_cookie())]),
        StatusCode::NO_CONTENT,
    )
        .into_response()
}

pub async fn me(current: CurrentUser) -> Json<mela_types::user::PublicUser> {
    Json(current.user.public())
}
