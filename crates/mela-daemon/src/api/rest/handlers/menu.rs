//! Provider-managed storefront menus
//!
//! The category in the path is parsed into the closed `MenuCategory` enum
//! before anything else happens; an unknown slug is a 400, never a dynamic
//! dispatch.

use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::pricing::MAX_ITEM_PRICE_MINOR;
use crate::session::ProviderContext;
use crate::storage::MenuItemUpdate;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use mela_types::{ItemId, MenuCategory, MenuItem};
use serde::Deserialize;

fn parse_category(slug: &str) -> ApiResult<MenuCategory> {
    Ok(MenuCategory::parse_slug(slug)?)
}

fn parse_item_id(raw: &str) -> ApiResult<ItemId> {
    ItemId::parse(raw).map_err(|_| ApiError::BadRequest(format!("bad item id: {raw}")))
}

fn check_price(price_minor: i64) -> ApiResult<()> {
    if price_minor <= 0 || price_minor > MAX_ITEM_PRICE_MINOR {
        return Err(ApiError::Validation(format!(
            "price must be between 1 and {MAX_ITEM_PRICE_MINOR} minor units"
        )));
    }
    Ok(())
}

pub async fn list_public_items(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<Vec<MenuItem>>> {
    let category = parse_category(&slug)?;
    let mut items = state.storage.list_menu_items(category).await?;
    items.retain(|i| i.available);
    Ok(Json(items))
}

pub async fn list_own_items(
    State(state): State<AppState>,
    ctx: ProviderContext,
    Path(slug): Path<String>,
) -> ApiResult<Json<Vec<MenuItem>>> {
    let category = parse_category(&slug)?;
    Ok(Json(
        state
            .storage
            .list_menu_items_for_provider(&ctx.provider.id, category)
            .await?,
    ))
}

#[derive(Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price_minor: i64,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

pub async fn create_item(
    State(state): State<AppState>,
    ctx: ProviderContext,
    Path(slug): Path<String>,
    Json(req): Json<CreateItemRequest>,
) -> ApiResult<(StatusCode, Json<MenuItem>)> {
    let category = parse_category(&slug)?;
    if req.name.trim().is_empty() {
        return Err(ApiError::Validation("item name is required".into()));
    }
    check_price(req.price_minor)?;

    let item = state
        .storage
        .create_menu_item(MenuItem {
            id: ItemId::generate(),
            provider_id: ctx.provider.id,
            category,
            name: req.name.trim().to_string(),
            description: req.description,
            price_minor: req.price_minor,
            available: req.available,
            created_at: chrono::Utc::now(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_item(
    State(state): State<AppState>,
    ctx: ProviderContext,
    Path((slug, item_id)): Path<(String, String)>,
    Json(update): Json<MenuItemUpdate>,
) -> ApiResult<Json<MenuItem>> {
    let category = parse_category(&slug)?;
    let id = parse_item_id(&item_id)?;
    if let Some(price) = update.price_minor {
        check_price(price)?;
    }

    let existing = state
        .storage
        .get_menu_item(&id, category)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("menu item: {id}")))?;
    if existing.provider_id != ctx.provider.id {
        return Err(ApiError::Forbidden("not your menu item".into()));
    }

    Ok(Json(
        state.storage.update_menu_item(&id, category, update).await?,
    ))
}

pub async fn delete_item(
    State(state): State<AppState>,
    ctx: ProviderContext,
    Path((slug, item_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let category = parse_category(&slug)?;
    let id = parse_item_id(&item_id)?;

    let existing = state
        .storage
        .get_menu_item(&id, category)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("menu item: {id}")))?;
    if existing.provider_id != ctx.provider.id {
        return Err(ApiError::Forbidden("not your menu item".into()));
    }

    state.storage.delete_menu_item(&id, category).await?;
    Ok(StatusCode::NO_CONTENT)
}
