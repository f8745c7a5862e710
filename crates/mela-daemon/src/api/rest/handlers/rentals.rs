//! No-brokerage rental listings

use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::session::CurrentUser;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use mela_types::{PropertyId, RentalProperty, Role};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct CreatePropertyRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub property_type: String,
    pub rent_minor: i64,
    #[serde(default)]
    pub area_sqft: Option<u32>,
    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub bathrooms: Option<u32>,
    #[serde(default)]
    pub furnishing: Option<String>,
    pub address: String,
    #[serde(default)]
    pub locality: Option<String>,
    #[serde(default)]
    pub amenities: Vec<String>,
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<RentalProperty>>> {
    Ok(Json(state.storage.list_properties().await?))
}

pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<CreatePropertyRequest>,
) -> ApiResult<(StatusCode, Json<RentalProperty>)> {
    if req.title.trim().is_empty() {
        return Err(ApiError::Validation("title is required".into()));
    }
    if req.address.trim().is_empty() {
        return Err(ApiError::Validation("address is required".into()));
    }
    if req.rent_minor <= 0 {
        return Err(ApiError::Validation("rent must be positive".into()));
    }

    let property = state
        .storage
        .create_property(RentalProperty {
            id: PropertyId::generate(),
            owner_id: current.user.id,
            title: req.title.trim().to_string(),
            description: req.description,
            property_type: req.property_type,
            rent_minor: req.rent_minor,
            area_sqft: req.area_sqft,
            bedrooms: req.bedrooms,
            bathrooms: req.bathrooms,
            furnishing: req.furnishing,
            address: req.address,
            locality: req.locality,
            amenities: req.amenities,
            created_at: chrono::Utc::now(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(property)))
}

pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RentalProperty>> {
    let id = PropertyId::parse(&id)
        .map_err(|_| ApiError::BadRequest(format!("bad property id: {id}")))?;
    let property = state
        .storage
        .get_property(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("property: {id}")))?;
    Ok(Json(property))
}

pub async fn delete(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = PropertyId::parse(&id)
        .map_err(|_| ApiError::BadRequest(format!("bad property id: {id}")))?;
    let property = state
        .storage
        .get_property(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("property: {id}")))?;
    if property.owner_id != current.user.id && current.user.role != Role::Admin {
        return Err(ApiError::Forbidden("not your listing".into()));
    }
    state.storage.delete_property(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
