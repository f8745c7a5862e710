//! Grocery orders
//!
//! Clients submit product ids and quantities; unit prices, the subtotal,
//! and every fee are resolved server-side.

use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::pricing;
use crate::session::CurrentUser;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use mela_types::{Order, OrderId, OrderLine, OrderStatus, ProductId, Role};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub lines: Vec<OrderLineRequest>,
    pub delivery_address: String,
}

pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<CreateOrderRequest>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    if req.lines.is_empty() {
        return Err(ApiError::Validation("order has no lines".into()));
    }
    if req.delivery_address.trim().is_empty() {
        return Err(ApiError::Validation("delivery address is required".into()));
    }

    let mut lines = Vec::with_capacity(req.lines.len());
    for line in &req.lines {
        if line.quantity == 0 || line.quantity > pricing::MAX_LINE_QUANTITY {
            return Err(ApiError::Validation(format!(
                "quantity must be between 1 and {}",
                pricing::MAX_LINE_QUANTITY
            )));
        }
        let product = state
            .storage
            .get_product(&line.product_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("product: {}", line.product_id)))?;
        if !product.in_stock {
            return Err(ApiError::BadRequest(format!(
                "product out of stock: {}",
                product.name
            )));
        }
        lines.push(OrderLine {
            product_id: product.id,
            quantity: line.quantity,
            unit_price_minor: product.price_minor,
        });
    }

    let subtotal: i64 = lines.iter().map(OrderLine::line_total_minor).sum();
    let platform_fee = pricing::platform_fee_minor(subtotal);
    let delivery_fee = pricing::delivery_fee_minor(subtotal);

    let order = state
        .storage
        .create_order(Order {
            id: OrderId::generate(),
            customer_id: current.user.id,
            lines,
            subtotal_minor: subtotal,
            platform_fee_minor: platform_fee,
            delivery_fee_minor: delivery_fee,
            total_minor: subtotal + platform_fee + delivery_fee,
            delivery_address: req.delivery_address.trim().to_string(),
            gateway_order_id: None,
            payment_id: None,
            status: OrderStatus::Pending,
            created_at: chrono::Utc::now(),
        })
        .await?;

    tracing::info!(order_id = %order.id, total_minor = order.total_minor, "order created");
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_own(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(
        state
            .storage
            .list_orders_for_customer(&current.user.id)
            .await?,
    ))
}

pub async fn get_one(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Order>> {
    let id = OrderId::parse(&id).map_err(|_| ApiError::BadRequest(format!("bad order id: {id}")))?;
    let order = state
        .storage
        .get_order(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("order: {id}")))?;
    if order.customer_id != current.user.id && current.user.role != Role::Admin {
        return Err(ApiError::Forbidden("not your order".into()));
    }
    Ok(Json(order))
}
