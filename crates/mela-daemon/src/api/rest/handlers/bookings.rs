//! Booking lifecycle endpoints
//!
//! Every status move is checked by the pure transition function first and
//! then applied as a compare-and-set against the status the check ran on,
//! so two racing requests leave exactly one winner.

use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::session::{CurrentUser, ProviderContext};
use crate::storage::BookingPatch;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use mela_lifecycle::{
    generate_code, is_well_formed, next_status, total_minor, validate_draft, verify_code, Actor,
    BookingEvent, InvoiceDraft,
};
use mela_notify::templates;
use mela_types::{
    Booking, BookingId, BookingStatus, Invoice, InvoiceId, NewBooking, Role, ServiceProvider,
};
use serde::{Deserialize, Serialize};

fn parse_booking_id(raw: &str) -> ApiResult<BookingId> {
    BookingId::parse(raw).map_err(|_| ApiError::BadRequest(format!("bad booking id: {raw}")))
}

async fn load_booking(state: &AppState, id: &BookingId) -> ApiResult<Booking> {
    state
        .storage
        .get_booking(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("booking: {id}")))
}

/// The booking must be assigned to this provider
fn check_assigned(booking: &Booking, provider: &ServiceProvider) -> ApiResult<()> {
    if booking.provider_id != Some(provider.id) {
        return Err(ApiError::Forbidden("booking is not assigned to you".into()));
    }
    Ok(())
}

pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<NewBooking>,
) -> ApiResult<(StatusCode, Json<Booking>)> {
    if req.address.trim().is_empty() {
        return Err(ApiError::Validation("address is required".into()));
    }
    if req.phone.trim().is_empty() {
        return Err(ApiError::Validation("phone is required".into()));
    }
    state
        .storage
        .get_problem(&req.problem_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("problem: {}", req.problem_id)))?;

    let booking = state
        .storage
        .create_booking(Booking::create(current.user.id, req))
        .await?;

    tracing::info!(booking_id = %booking.id, customer_id = %booking.customer_id, "booking created");
    Ok((StatusCode::CREATED, Json(booking)))
}

pub async fn list_own(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<Json<Vec<Booking>>> {
    Ok(Json(
        state
            .storage
            .list_bookings_for_customer(&current.user.id)
            .await?,
    ))
}

#[derive(Serialize)]
pub struct ProviderBookings {
    /// Unclaimed pending bookings in the provider's category
    pub pending: Vec<Booking>,
    /// Bookings assigned to this provider
    pub assigned: Vec<Booking>,
}

pub async fn list_for_provider(
    State(state): State<AppState>,
    ctx: ProviderContext,
) -> ApiResult<Json<ProviderBookings>> {
    let pending = state
        .storage
        .list_pending_for_category(&ctx.provider.category_id)
        .await?;
    let assigned = state
        .storage
        .list_bookings_for_provider(&ctx.provider.id)
        .await?;
    Ok(Json(ProviderBookings { pending, assigned }))
}

#[derive(Deserialize)]
pub struct StatusChangeRequest {
    pub event: String,
}

pub async fn change_status(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<StatusChangeRequest>,
) -> ApiResult<Json<Booking>> {
    let id = parse_booking_id(&id)?;
    let booking = load_booking(&state, &id).await?;

    let event = match req.event.as_str() {
        "accept" => BookingEvent::Accept,
        "decline" => BookingEvent::Decline,
        "start" => BookingEvent::StartJob,
        "cancel" => BookingEvent::Cancel,
        other => {
            return Err(ApiError::BadRequest(format!("unknown event: {other}")));
        }
    };

    // Resolve who the caller is relative to this booking
    let profile = state.storage.get_provider_by_user(&current.user.id).await?;
    let (actor, provider) = if current.user.role == Role::Admin {
        (Actor::Admin, None)
    } else if let Some(profile) = profile {
        let claimable = booking.status == BookingStatus::Pending
            && booking.provider_id.is_none()
            && provider_covers(&state, &profile, &booking).await?;
        if booking.provider_id == Some(profile.id) || claimable {
            (Actor::Provider, Some(profile))
        } else if booking.customer_id == current.user.id {
            (Actor::Customer, None)
        } else {
            return Err(ApiError::Forbidden("not your booking".into()));
        }
    } else if booking.customer_id == current.user.id {
        (Actor::Customer, None)
    } else {
        return Err(ApiError::Forbidden("not your booking".into()));
    };

    let next = next_status(booking.status, actor, event)?;

    let mut patch = BookingPatch::default();
    if event == BookingEvent::Accept {
        patch.provider_id = provider.as_ref().map(|p| p.id);
    }
    if event == BookingEvent::Cancel {
        // Leaving awaiting_otp invalidates the code
        patch.service_code = Some(None);
    }

    let updated = state
        .storage
        .update_booking_if_status(&id, booking.status, next, patch)
        .await?;
    tracing::info!(booking_id = %id, from = %booking.status, to = %next, "booking transition");

    match event {
        BookingEvent::Accept => {
            if let Some(provider) = &provider {
                let when = updated.scheduled_at.map(|t| t.to_rfc3339());
                mela_notify::dispatch(
                    state.notifier.clone(),
                    updated.phone.clone(),
                    templates::booking_accepted(&provider.business_name, when.as_deref()),
                );
            }
        }
        BookingEvent::Decline => {
            if let Some(provider) = &provider {
                mela_notify::dispatch(
                    state.notifier.clone(),
                    updated.phone.clone(),
                    templates::booking_declined(&provider.business_name),
                );
            }
        }
        _ => {}
    }

    Ok(Json(updated))
}

async fn provider_covers(
    state: &AppState,
    profile: &ServiceProvider,
    booking: &Booking,
) -> ApiResult<bool> {
    let problem = state.storage.get_problem(&booking.problem_id).await?;
    Ok(problem.is_some_and(|p| p.category_id == profile.category_id))
}

pub async fn generate_otp(
    State(state): State<AppState>,
    ctx: ProviderContext,
    Path(id): Path<String>,
) -> ApiResult<Json<Booking>> {
    let id = parse_booking_id(&id)?;
    let booking = load_booking(&state, &id).await?;
    check_assigned(&booking, &ctx.provider)?;

    let next = next_status(booking.status, Actor::Provider, BookingEvent::RequestCode)?;
    let code = generate_code(&mut rand::thread_rng());

    let updated = state
        .storage
        .update_booking_if_status(
            &id,
            booking.status,
            next,
            BookingPatch {
                service_code: Some(Some(code.clone())),
                ..Default::default()
            },
        )
        .await?;

    tracing::info!(booking_id = %id, "completion code issued");
    mela_notify::dispatch(
        state.notifier.clone(),
        updated.phone.clone(),
        templates::service_code(&code),
    );

    Ok(Json(updated))
}

#[derive(Deserialize)]
pub struct VerifyOtpRequest {
    pub code: String,
}

pub async fn verify_otp(
    State(state): State<AppState>,
    ctx: ProviderContext,
    Path(id): Path<String>,
    Json(req): Json<VerifyOtpRequest>,
) -> ApiResult<Json<Booking>> {
    let id = parse_booking_id(&id)?;
    let booking = load_booking(&state, &id).await?;
    check_assigned(&booking, &ctx.provider)?;

    if !is_well_formed(&req.code) {
        return Err(ApiError::BadRequest(
            "code must be exactly 6 digits".into(),
        ));
    }

    let next = next_status(booking.status, Actor::Provider, BookingEvent::SubmitCode)?;
    if let Err(err) = verify_code(booking.service_code.as_deref(), &req.code) {
        tracing::warn!(booking_id = %id, error = %err, "completion code rejected");
        return Err(err.into());
    }

    // The code is single-use: it goes away with the transition
    let updated = state
        .storage
        .update_booking_if_status(
            &id,
            booking.status,
            next,
            BookingPatch {
                service_code: Some(None),
                ..Default::default()
            },
        )
        .await?;

    tracing::info!(booking_id = %id, "completion code accepted");
    Ok(Json(updated))
}

pub async fn create_invoice(
    State(state): State<AppState>,
    ctx: ProviderContext,
    Path(id): Path<String>,
    Json(draft): Json<InvoiceDraft>,
) -> ApiResult<(StatusCode, Json<Invoice>)> {
    let id = parse_booking_id(&id)?;
    let booking = load_booking(&state, &id).await?;
    check_assigned(&booking, &ctx.provider)?;

    next_status(booking.status, Actor::Provider, BookingEvent::SubmitInvoice)?;
    validate_draft(&draft)?;
    let total = total_minor(&draft);

    let invoice = state
        .storage
        .create_invoice_for_booking(Invoice {
            id: InvoiceId::generate(),
            booking_id: id,
            spare_parts: draft.spare_parts,
            service_charge_minor: draft.service_charge_minor,
            notes: draft.notes,
            total_minor: total,
            gateway_order_id: None,
            payment_id: None,
            paid: false,
            created_at: chrono::Utc::now(),
        })
        .await?;

    tracing::info!(booking_id = %id, invoice_id = %invoice.id, total_minor = total, "invoice raised");
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Invoice>> {
    let id = parse_booking_id(&id)?;
    let booking = load_booking(&state, &id).await?;

    let is_customer = booking.customer_id == current.user.id;
    let is_provider = match state.storage.get_provider_by_user(&current.user.id).await? {
        Some(profile) => booking.provider_id == Some(profile.id),
        None => false,
    };
    if !is_customer && !is_provider && current.user.role != Role::Admin {
        return Err(ApiError::Forbidden("not your booking".into()));
    }

    let invoice = state
        .storage
        .get_invoice_for_booking(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no invoice for booking: {id}")))?;
    Ok(Json(invoice))
}
