//! Restaurant table bookings

use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::session::CurrentUser;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use mela_types::{
    ProviderId, Role, TableBooking, TableBookingId, TableBookingStatus,
};
use serde::Deserialize;

const MAX_PARTY_SIZE: u32 = 20;

#[derive(Deserialize)]
pub struct CreateTableBookingRequest {
    pub provider_id: ProviderId,
    pub party_size: u32,
    pub booked_for: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub notes: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<CreateTableBookingRequest>,
) -> ApiResult<(StatusCode, Json<TableBooking>)> {
    if req.party_size == 0 || req.party_size > MAX_PARTY_SIZE {
        return Err(ApiError::Validation(format!(
            "party size must be between 1 and {MAX_PARTY_SIZE}"
        )));
    }
    let provider = state
        .storage
        .get_provider(&req.provider_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("provider: {}", req.provider_id)))?;
    let restaurant = state
        .storage
        .get_category_by_slug("restaurant")
        .await?
        .ok_or_else(|| ApiError::Internal("restaurant category missing".into()))?;
    if provider.category_id != restaurant.id {
        return Err(ApiError::BadRequest(
            "provider is not a restaurant".into(),
        ));
    }

    let booking = state
        .storage
        .create_table_booking(TableBooking {
            id: TableBookingId::generate(),
            customer_id: current.user.id,
            provider_id: req.provider_id,
            party_size: req.party_size,
            booked_for: req.booked_for,
            notes: req.notes,
            status: TableBookingStatus::Pending,
            created_at: chrono::Utc::now(),
        })
        .await?;

    tracing::info!(table_booking_id = %booking.id, "table booking created");
    Ok((StatusCode::CREATED, Json(booking)))
}

/// A restaurant account sees its incoming reservations, everyone else their
/// own
pub async fn list_own(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<Json<Vec<TableBooking>>> {
    if let Some(profile) = state.storage.get_provider_by_user(&current.user.id).await? {
        return Ok(Json(
            state
                .storage
                .list_table_bookings_for_provider(&profile.id)
                .await?,
        ));
    }
    Ok(Json(
        state
            .storage
            .list_table_bookings_for_customer(&current.user.id)
            .await?,
    ))
}

#[derive(Deserialize)]
pub struct TableStatusRequest {
    pub status: TableBookingStatus,
}

pub async fn change_status(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<TableStatusRequest>,
) -> ApiResult<Json<TableBooking>> {
    let id = TableBookingId::parse(&id)
        .map_err(|_| ApiError::BadRequest(format!("bad table booking id: {id}")))?;
    let booking = state
        .storage
        .get_table_booking(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("table booking: {id}")))?;

    let profile = state.storage.get_provider_by_user(&current.user.id).await?;
    let is_restaurant = profile.is_some_and(|p| p.id == booking.provider_id);
    let is_customer = booking.customer_id == current.user.id;

    let allowed = match req.status {
        // Only the restaurant confirms
        TableBookingStatus::Confirmed => is_restaurant || current.user.role == Role::Admin,
        // Either side can cancel
        TableBookingStatus::Cancelled => {
            is_restaurant || is_customer || current.user.role == Role::Admin
        }
        TableBookingStatus::Pending => false,
    };
    if !allowed {
        return Err(ApiError::Forbidden("not your table booking".into()));
    }
    if booking.status == TableBookingStatus::Cancelled
        || (booking.status == TableBookingStatus::Confirmed
            && req.status == TableBookingStatus::Confirmed)
    {
        return Err(ApiError::BadRequest(format!(
            "cannot move a {} booking to {}",
            booking.status, req.status
        )));
    }

    let updated = state
        .storage
        .update_table_booking_status(&id, booking.status, req.status)
        .await?;
    Ok(Json(updated))
}
