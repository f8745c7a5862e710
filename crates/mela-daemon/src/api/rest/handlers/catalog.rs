//! Service categories, problem trees, provider profiles, grocery catalog

use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::session::{CurrentUser, ProviderContext};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use mela_types::{
    GroceryProduct, ProviderId, Role, ServiceCategory, ServiceProblem, ServiceProvider,
};
use serde::Deserialize;

pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<ServiceCategory>>> {
    Ok(Json(state.storage.list_categories().await?))
}

pub async fn list_problems(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<Vec<ServiceProblem>>> {
    let category = state
        .storage
        .get_category_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("category: {slug}")))?;
    Ok(Json(state.storage.list_problems(&category.id).await?))
}

#[derive(Deserialize)]
pub struct ProviderFilter {
    pub category: Option<String>,
}

pub async fn list_providers(
    State(state): State<AppState>,
    Query(filter): Query<ProviderFilter>,
) -> ApiResult<Json<Vec<ServiceProvider>>> {
    let Some(slug) = filter.category else {
        return Err(ApiError::BadRequest("category filter is required".into()));
    };
    let category = state
        .storage
        .get_category_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("category: {slug}")))?;
    Ok(Json(
        state.storage.list_providers_by_category(&category.id).await?,
    ))
}

pub async fn get_provider(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ServiceProvider>> {
    let id = ProviderId::parse(&id)
        .map_err(|_| ApiError::BadRequest(format!("bad provider id: {id}")))?;
    let provider = state
        .storage
        .get_provider(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("provider: {id}")))?;
    Ok(Json(provider))
}

#[derive(Deserialize)]
pub struct CreateProfileRequest {
    pub category_slug: String,
    pub business_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub experience_years: Option<u32>,
    #[serde(default)]
    pub address: Option<String>,
}

pub async fn create_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<CreateProfileRequest>,
) -> ApiResult<(StatusCode, Json<ServiceProvider>)> {
    if current.user.role != Role::Provider {
        return Err(ApiError::Forbidden(
            "only provider accounts can create a business profile".into(),
        ));
    }
    if req.business_name.trim().is_empty() {
        return Err(ApiError::Validation("business name is required".into()));
    }
    let category = state
        .storage
        .get_category_by_slug(&req.category_slug)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("category: {}", req.category_slug)))?;

    let provider = state
        .storage
        .create_provider(ServiceProvider {
            id: ProviderId::generate(),
            user_id: current.user.id,
            category_id: category.id,
            business_name: req.business_name.trim().to_string(),
            description: req.description,
            experience_years: req.experience_years,
            address: req.address,
            rating_hundredths: 0,
            review_count: 0,
            created_at: chrono::Utc::now(),
        })
        .await?;

    tracing::info!(provider_id = %provider.id, category = %req.category_slug, "provider profile created");
    Ok((StatusCode::CREATED, Json(provider)))
}

pub async fn get_own_profile(ctx: ProviderContext) -> Json<ServiceProvider> {
    Json(ctx.provider)
}

#[derive(Deserialize)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub search: Option<String>,
}

pub async fn list_grocery_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> ApiResult<Json<Vec<GroceryProduct>>> {
    let mut products = state.storage.list_products().await?;
    if let Some(category) = filter.category {
        products.retain(|p| p.category == category);
    }
    if let Some(search) = filter.search {
        let needle = search.to_lowercase();
        products.retain(|p| p.name.to_lowercase().contains(&needle));
    }
    Ok(Json(products))
}
