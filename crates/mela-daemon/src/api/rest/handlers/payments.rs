//! Payment reconciliation
//!
//! Two independent confirmation paths converge on the same paid flag: the
//! synchronous client-reported signature and the asynchronous gateway
//! webhook. Whichever verifies first marks the target paid; the other
//! becomes a no-op. Nothing is ever credited on an unverified signature.

use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::session::CurrentUser;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use mela_payments::{verify_payment_signature, verify_webhook_signature, WebhookEnvelope};
use mela_types::{InvoiceId, OrderId, Role};
use serde::{Deserialize, Serialize};

const WEBHOOK_SIGNATURE_HEADER: &str = "x-gateway-signature";

#[derive(Deserialize)]
pub struct CreateGatewayOrderRequest {
    #[serde(default)]
    pub order_id: Option<OrderId>,
    #[serde(default)]
    pub invoice_id: Option<InvoiceId>,
}

#[derive(Serialize)]
pub struct GatewayOrderResponse {
    pub gateway_order_id: String,
    pub amount_minor: i64,
    pub currency: String,
    /// Public key id the client checkout needs
    pub key_id: String,
}

/// Create a gateway order binding a local order or invoice to a payment
/// intent. Exactly one of `order_id` / `invoice_id` must be given.
pub async fn create_gateway_order(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<CreateGatewayOrderRequest>,
) -> ApiResult<Json<GatewayOrderResponse>> {
    let (amount, receipt) = match (&req.order_id, &req.invoice_id) {
        (Some(order_id), None) => {
            let order = state
                .storage
                .get_order(order_id)
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("order: {order_id}")))?;
            if order.customer_id != current.user.id && current.user.role != Role::Admin {
                return Err(ApiError::Forbidden("not your order".into()));
            }
            if order.status != mela_types::OrderStatus::Pending {
                return Err(ApiError::BadRequest("order is not payable".into()));
            }
            (order.total_minor, format!("order:{order_id}"))
        }
        (None, Some(invoice_id)) => {
            let invoice = state
                .storage
                .get_invoice(invoice_id)
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("invoice: {invoice_id}")))?;
            let booking = state
                .storage
                .get_booking(&invoice.booking_id)
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("booking: {}", invoice.booking_id)))?;
            if booking.customer_id != current.user.id && current.user.role != Role::Admin {
                return Err(ApiError::Forbidden("not your invoice".into()));
            }
            if invoice.paid {
                return Err(ApiError::BadRequest("invoice is already paid".into()));
            }
            (invoice.total_minor, format!("invoice:{invoice_id}"))
        }
        _ => {
            return Err(ApiError::BadRequest(
                "exactly one of order_id or invoice_id is required".into(),
            ));
        }
    };

    let gateway_order = state
        .gateway
        .create_order(amount, &state.payments.currency, &receipt)
        .await?;

    if let Some(order_id) = &req.order_id {
        state
            .storage
            .set_order_gateway_order(order_id, &gateway_order.id)
            .await?;
    }
    if let Some(invoice_id) = &req.invoice_id {
        state
            .storage
            .set_invoice_gateway_order(invoice_id, &gateway_order.id)
            .await?;
    }

    Ok(Json(GatewayOrderResponse {
        gateway_order_id: gateway_order.id,
        amount_minor: gateway_order.amount,
        currency: gateway_order.currency,
        key_id: state.payments.key_id.clone(),
    }))
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    pub gateway_order_id: String,
    pub payment_id: String,
    pub signature: String,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub verified: bool,
    /// False when another confirmation path got there first
    pub newly_paid: bool,
}

/// Synchronous confirmation path
pub async fn verify(
    State(state): State<AppState>,
    _current: CurrentUser,
    Json(req): Json<VerifyRequest>,
) -> ApiResult<Json<VerifyResponse>> {
    if !verify_payment_signature(
        &state.payments.key_secret,
        &req.gateway_order_id,
        &req.payment_id,
        &req.signature,
    ) {
        tracing::warn!(gateway_order_id = %req.gateway_order_id, "payment signature rejected");
        return Err(ApiError::SignatureRejected);
    }

    let newly_paid = apply_payment(&state, &req.gateway_order_id, &req.payment_id).await?;
    Ok(Json(VerifyResponse {
        verified: true,
        newly_paid,
    }))
}

#[derive(Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
}

/// Asynchronous confirmation path; verified over the raw body bytes before
/// any parsing
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<WebhookResponse>)> {
    let signature = headers
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("missing webhook signature header".into()))?;

    if !verify_webhook_signature(&state.payments.webhook_secret, &body, signature) {
        tracing::warn!("webhook signature rejected");
        return Err(ApiError::SignatureRejected);
    }

    let envelope: WebhookEnvelope = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("unparseable webhook body: {e}")))?;

    if !envelope.is_payment_captured() {
        tracing::debug!(event = %envelope.event, "ignoring webhook event");
        return Ok((StatusCode::OK, Json(WebhookResponse { status: "ignored" })));
    }

    let payment = envelope
        .payment()
        .ok_or_else(|| ApiError::BadRequest("captured event without payment".into()))?;

    // The event id is recorded only after the effects commit: a delivery
    // that failed to apply must stay retryable, not be suppressed as a
    // replay. Double application is impossible regardless; marking paid is
    // conditional on the current state.
    match apply_payment(&state, &payment.order_id, &payment.id).await {
        Ok(_) => {
            if state
                .storage
                .record_payment_event(&envelope.dedupe_key())
                .await?
            {
                Ok((StatusCode::OK, Json(WebhookResponse { status: "processed" })))
            } else {
                tracing::info!(dedupe_key = %envelope.dedupe_key(), "webhook replay suppressed");
                Ok((StatusCode::OK, Json(WebhookResponse { status: "duplicate" })))
            }
        }
        // A gateway order we never issued; acknowledge so the gateway
        // stops retrying
        Err(ApiError::NotFound(_)) => {
            tracing::warn!(gateway_order_id = %payment.order_id, "webhook for unknown order");
            Ok((StatusCode::OK, Json(WebhookResponse { status: "unknown" })))
        }
        Err(err) => Err(err),
    }
}

/// Mark whatever the gateway order is bound to as paid
///
/// Returns whether this call was the one that flipped it.
async fn apply_payment(
    state: &AppState,
    gateway_order_id: &str,
    payment_id: &str,
) -> ApiResult<bool> {
    if let Some(invoice) = state
        .storage
        .find_invoice_by_gateway_order(gateway_order_id)
        .await?
    {
        let newly_paid = state
            .storage
            .mark_invoice_paid(&invoice.id, payment_id)
            .await?;
        if newly_paid {
            tracing::info!(invoice_id = %invoice.id, payment_id, "invoice paid");
        }
        return Ok(newly_paid);
    }

    if let Some(order) = state
        .storage
        .find_order_by_gateway_order(gateway_order_id)
        .await?
    {
        let newly_paid = state.storage.mark_order_paid(&order.id, payment_id).await?;
        if newly_paid {
            tracing::info!(order_id = %order.id, payment_id, "order paid");
        }
        return Ok(newly_paid);
    }

    Err(ApiError::NotFound(format!(
        "gateway order: {gateway_order_id}"
    )))
}
