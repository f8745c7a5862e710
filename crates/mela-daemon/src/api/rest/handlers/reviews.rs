//! Provider reviews

use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::session::CurrentUser;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use mela_types::{BookingId, ProviderId, Review, ReviewId};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct CreateReviewRequest {
    pub provider_id: ProviderId,
    #[serde(default)]
    pub booking_id: Option<BookingId>,
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<CreateReviewRequest>,
) -> ApiResult<(StatusCode, Json<Review>)> {
    if !(1..=5).contains(&req.rating) {
        return Err(ApiError::Validation("rating must be 1 to 5".into()));
    }
    state
        .storage
        .get_provider(&req.provider_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("provider: {}", req.provider_id)))?;

    if let Some(booking_id) = &req.booking_id {
        let booking = state
            .storage
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("booking: {booking_id}")))?;
        if booking.customer_id != current.user.id {
            return Err(ApiError::Forbidden("not your booking".into()));
        }
        if booking.provider_id != Some(req.provider_id) {
            return Err(ApiError::BadRequest(
                "booking was not served by this provider".into(),
            ));
        }
    }

    let review = state
        .storage
        .create_review(Review {
            id: ReviewId::generate(),
            customer_id: current.user.id,
            provider_id: req.provider_id,
            booking_id: req.booking_id,
            rating: req.rating,
            comment: req.comment,
            created_at: chrono::Utc::now(),
        })
        .await?;

    tracing::info!(provider_id = %req.provider_id, rating = req.rating, "review created");
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn list_for_provider(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Review>>> {
    let id = ProviderId::parse(&id)
        .map_err(|_| ApiError::BadRequest(format!("bad provider id: {id}")))?;
    Ok(Json(state.storage.list_reviews_for_provider(&id).await?))
}
