//! End-to-end API tests against the real router and the memory backend

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use hmac::{Hmac, Mac};
use http_body_util::BodyExt;
use mela_daemon::api::rest::router::build_router;
use mela_daemon::api::rest::state::AppState;
use mela_daemon::config::PaymentsConfig;
use mela_daemon::session::SessionStore;
use mela_daemon::storage::{self, InMemoryStorage, Storage};
use mela_notify::NoopNotifier;
use mela_payments::{payment_signature, SandboxGateway};
use mela_types::{BookingId, BookingStatus};
use serde_json::{json, Value};
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const KEY_SECRET: &str = "test_key_secret";
const WEBHOOK_SECRET: &str = "whsec_test";

async fn test_app() -> (Router, AppState) {
    let memory = InMemoryStorage::new();
    storage::seed::install(&memory).await.unwrap();

    let state = AppState {
        storage: Arc::new(memory) as Arc<dyn Storage>,
        sessions: Arc::new(SessionStore::new(Duration::from_secs(3600))),
        gateway: Arc::new(SandboxGateway),
        notifier: Arc::new(NoopNotifier),
        payments: PaymentsConfig {
            key_id: "key_test".into(),
            key_secret: KEY_SECRET.into(),
            webhook_secret: WEBHOOK_SECRET.into(),
            ..Default::default()
        },
    };
    (build_router(state.clone(), false), state)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value, Option<String>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, format!("mela_session={cookie}"));
    }
    let request = match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let token = response
        .headers()
        .get(SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("mela_session="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body, token)
}

async fn signup(app: &Router, username: &str, role: &str) -> String {
    let (status, _, token) = send(
        app,
        Method::POST,
        "/api/v1/auth/signup",
        None,
        Some(json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "hunter22",
            "role": role,
            "phone": "+919812345678",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    token.expect("signup sets a session cookie")
}

/// Provider account plus an electrician business profile; returns (session, provider_id)
async fn electrician(app: &Router, username: &str) -> (String, String) {
    let session = signup(app, username, "provider").await;
    let (status, profile, _) = send(
        app,
        Method::POST,
        "/api/v1/provider/profile",
        Some(&session),
        Some(json!({
            "category_slug": "electrician",
            "business_name": "Sharma Electricals",
            "experience_years": 8,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    (session, profile["id"].as_str().unwrap().to_string())
}

/// A pending booking for the first electrician problem; returns its id
async fn electrician_booking(app: &Router, session: &str) -> String {
    let (_, problems, _) = send(
        app,
        Method::GET,
        "/api/v1/categories/electrician/problems",
        None,
        None,
    )
    .await;
    let problem_id = problems
        .as_array()
        .unwrap()
        .iter()
        .find(|p| !p["parent_id"].is_null())
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, booking, _) = send(
        app,
        Method::POST,
        "/api/v1/bookings",
        Some(session),
        Some(json!({
            "problem_id": problem_id,
            "address": "12 MG Road, Mysuru",
            "phone": "+919812345678",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    booking["id"].as_str().unwrap().to_string()
}

fn webhook_signature(body: &str) -> String {
    let mut m = Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes()).unwrap();
    m.update(body.as_bytes());
    hex::encode(m.finalize().into_bytes())
}

async fn deliver_webhook(app: &Router, body: &str, signature: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/payments/webhook")
        .header(CONTENT_TYPE, "application/json")
        .header("x-gateway-signature", signature)
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health() {
    let (app, _) = test_app().await;
    let (status, body, _) = send(&app, Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_auth_required() {
    let (app, _) = test_app().await;
    let (status, body, _) = send(&app, Method::GET, "/api/v1/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHENTICATED");

    let (status, _, _) = send(&app, Method::GET, "/api/v1/bookings", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_and_wrong_password() {
    let (app, _) = test_app().await;
    signup(&app, "asha", "customer").await;

    let (status, user, token) = send(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "username": "Asha", "password": "hunter22" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["username"], "asha");
    assert!(user.get("password_hash").is_none());
    assert!(token.is_some());

    let (status, _, _) = send(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "username": "asha", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = send(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "username": "nobody", "password": "hunter22" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_full_booking_and_payment_flow() {
    let (app, state) = test_app().await;
    let customer = signup(&app, "ravi", "customer").await;
    let (provider, _provider_id) = electrician(&app, "sharma").await;
    let booking_id = electrician_booking(&app, &customer).await;

    // The provider sees it in the pending pool
    let (status, pool, _) = send(
        &app,
        Method::GET,
        "/api/v1/provider/bookings",
        Some(&provider),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pool["pending"].as_array().unwrap().len(), 1);

    // Accept, then start
    for event in ["accept", "start"] {
        let (status, body, _) = send(
            &app,
            Method::PATCH,
            &format!("/api/v1/bookings/{booking_id}/status"),
            Some(&provider),
            Some(json!({ "event": event })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "event {event}: {body}");
    }

    // Request the completion code; it must not appear in any response
    let (status, body, _) = send(
        &app,
        Method::POST,
        &format!("/api/v1/bookings/{booking_id}/generate-otp"),
        Some(&provider),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "awaiting_otp");
    assert!(body.get("service_code").is_none());

    let id = BookingId::parse(&booking_id).unwrap();
    let code = state
        .storage
        .get_booking(&id)
        .await
        .unwrap()
        .unwrap()
        .service_code
        .expect("code stored while awaiting_otp");
    assert_eq!(code.len(), 6);

    // Wrong code leaves the booking where it is
    let wrong = if code == "000000" { "000001" } else { "000000" };
    let (status, body, _) = send(
        &app,
        Method::POST,
        &format!("/api/v1/bookings/{booking_id}/verify-otp"),
        Some(&provider),
        Some(json!({ "code": wrong })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    // Right code moves to awaiting_bill and clears the stored code
    let (status, body, _) = send(
        &app,
        Method::POST,
        &format!("/api/v1/bookings/{booking_id}/verify-otp"),
        Some(&provider),
        Some(json!({ "code": code })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "awaiting_bill");
    assert!(state
        .storage
        .get_booking(&id)
        .await
        .unwrap()
        .unwrap()
        .service_code
        .is_none());

    // Replaying the used code fails: the window is closed
    let (status, _, _) = send(
        &app,
        Method::POST,
        &format!("/api/v1/bookings/{booking_id}/verify-otp"),
        Some(&provider),
        Some(json!({ "code": code })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Invoice: Wire 5000 + service 20000 = 25000 minor units
    let (status, invoice, _) = send(
        &app,
        Method::POST,
        &format!("/api/v1/bookings/{booking_id}/create-invoice"),
        Some(&provider),
        Some(json!({
            "spare_parts": [{ "name": "Wire", "price_minor": 5000 }],
            "service_charge_minor": 20000,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(invoice["total_minor"], 25000);
    let invoice_id = invoice["id"].as_str().unwrap().to_string();

    // Customer creates the gateway order and confirms synchronously
    let (status, gateway_order, _) = send(
        &app,
        Method::POST,
        "/api/v1/payments/order",
        Some(&customer),
        Some(json!({ "invoice_id": invoice_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(gateway_order["amount_minor"], 25000);
    let gw_id = gateway_order["gateway_order_id"].as_str().unwrap();

    // A bad signature pays nothing
    let (status, body, _) = send(
        &app,
        Method::POST,
        "/api/v1/payments/verify",
        Some(&customer),
        Some(json!({
            "gateway_order_id": gw_id,
            "payment_id": "pay_1",
            "signature": "deadbeef",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "PAYMENT_NOT_VERIFIED");

    let signature = payment_signature(KEY_SECRET, gw_id, "pay_1");
    let (status, body, _) = send(
        &app,
        Method::POST,
        "/api/v1/payments/verify",
        Some(&customer),
        Some(json!({
            "gateway_order_id": gw_id,
            "payment_id": "pay_1",
            "signature": signature,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["newly_paid"], true);

    let booking = state.storage.get_booking(&id).await.unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Completed);

    let (status, invoice, _) = send(
        &app,
        Method::GET,
        &format!("/api/v1/bookings/{booking_id}/invoice"),
        Some(&customer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(invoice["paid"], true);
    assert_eq!(invoice["payment_id"], "pay_1");
}

#[tokio::test]
async fn test_customer_cannot_drive_provider_transitions() {
    let (app, _) = test_app().await;
    let customer = signup(&app, "meena", "customer").await;
    let booking_id = electrician_booking(&app, &customer).await;

    let (status, body, _) = send(
        &app,
        Method::PATCH,
        &format!("/api/v1/bookings/{booking_id}/status"),
        Some(&customer),
        Some(json!({ "event": "accept" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");

    // But cancelling their own booking is fine
    let (status, body, _) = send(
        &app,
        Method::PATCH,
        &format!("/api/v1/bookings/{booking_id}/status"),
        Some(&customer),
        Some(json!({ "event": "cancel" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");

    // Terminal: no further moves
    let (status, _, _) = send(
        &app,
        Method::PATCH,
        &format!("/api/v1/bookings/{booking_id}/status"),
        Some(&customer),
        Some(json!({ "event": "cancel" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_accept_decline_race_single_winner() {
    let (app, state) = test_app().await;
    let customer = signup(&app, "kiran", "customer").await;
    let (p1, _) = electrician(&app, "volt").await;
    let (p2, _) = electrician(&app, "ampere").await;
    let booking_id = electrician_booking(&app, &customer).await;

    let status_path = format!("/api/v1/bookings/{booking_id}/status");
    let accept = send(
        &app,
        Method::PATCH,
        &status_path,
        Some(&p1),
        Some(json!({ "event": "accept" })),
    );
    let decline = send(
        &app,
        Method::PATCH,
        &status_path,
        Some(&p2),
        Some(json!({ "event": "decline" })),
    );
    let ((s1, _, _), (s2, _, _)) = tokio::join!(accept, decline);

    let ok = [s1, s2].iter().filter(|s| **s == StatusCode::OK).count();
    assert_eq!(ok, 1, "exactly one racer may win ({s1} vs {s2})");
    assert!([s1, s2].iter().any(|s| s.is_client_error()));

    let booking = state
        .storage
        .get_booking(&BookingId::parse(&booking_id).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(
        booking.status,
        BookingStatus::Accepted | BookingStatus::Declined
    ));
}

#[tokio::test]
async fn test_order_fees_and_webhook_idempotence() {
    let (app, state) = test_app().await;
    let customer = signup(&app, "divya", "customer").await;

    let (_, products, _) = send(&app, Method::GET, "/api/v1/grocery-products", None, None).await;
    let rice = products
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["name"] == "Basmati Rice")
        .unwrap();
    let rice_id = rice["id"].as_str().unwrap();
    assert_eq!(rice["price_minor"], 12000);

    // 2 kg rice: subtotal 24000, fee 1% = 240, delivery 3000
    let (status, order, _) = send(
        &app,
        Method::POST,
        "/api/v1/orders",
        Some(&customer),
        Some(json!({
            "lines": [{ "product_id": rice_id, "quantity": 2 }],
            "delivery_address": "4 Brigade Road",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["subtotal_minor"], 24000);
    assert_eq!(order["platform_fee_minor"], 240);
    assert_eq!(order["delivery_fee_minor"], 3000);
    assert_eq!(order["total_minor"], 27240);
    let order_id = order["id"].as_str().unwrap().to_string();

    // 5 kg rice crosses the free-delivery threshold
    let (_, big, _) = send(
        &app,
        Method::POST,
        "/api/v1/orders",
        Some(&customer),
        Some(json!({
            "lines": [{ "product_id": rice_id, "quantity": 5 }],
            "delivery_address": "4 Brigade Road",
        })),
    )
    .await;
    assert_eq!(big["subtotal_minor"], 60000);
    assert_eq!(big["delivery_fee_minor"], 0);

    let (status, gateway_order, _) = send(
        &app,
        Method::POST,
        "/api/v1/payments/order",
        Some(&customer),
        Some(json!({ "order_id": order_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let gw_id = gateway_order["gateway_order_id"].as_str().unwrap();

    let body = json!({
        "event": "payment.captured",
        "event_id": "evt_1",
        "payload": { "payment": { "entity": { "id": "pay_w1", "order_id": gw_id } } },
    })
    .to_string();

    // Tampered body is rejected before parsing
    let (status, reply) = deliver_webhook(&app, &body, &webhook_signature("{}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{reply}");

    let signature = webhook_signature(&body);
    let (status, reply) = deliver_webhook(&app, &body, &signature).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["status"], "processed");

    // Re-delivery is acknowledged but changes nothing
    let (status, reply) = deliver_webhook(&app, &body, &signature).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["status"], "duplicate");

    let order = state
        .storage
        .get_order(&mela_types::OrderId::parse(&order_id).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, mela_types::OrderStatus::Paid);
    assert_eq!(order.payment_id.as_deref(), Some("pay_w1"));
}

#[tokio::test]
async fn test_webhook_event_id_survives_unapplied_delivery() {
    let (app, state) = test_app().await;
    let customer = signup(&app, "farah", "customer").await;

    let (_, products, _) = send(&app, Method::GET, "/api/v1/grocery-products", None, None).await;
    let product_id = products.as_array().unwrap()[0]["id"].as_str().unwrap().to_string();
    let (status, order, _) = send(
        &app,
        Method::POST,
        "/api/v1/orders",
        Some(&customer),
        Some(json!({
            "lines": [{ "product_id": product_id, "quantity": 1 }],
            "delivery_address": "4 Brigade Road",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let order_id = order["id"].as_str().unwrap().to_string();

    let (status, gateway_order, _) = send(
        &app,
        Method::POST,
        "/api/v1/payments/order",
        Some(&customer),
        Some(json!({ "order_id": order_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let gw_id = gateway_order["gateway_order_id"].as_str().unwrap();

    // An acknowledged delivery that applied nothing must not consume the
    // event id; only a committed application may suppress later deliveries
    let stray = json!({
        "event": "payment.captured",
        "event_id": "evt_retry",
        "payload": { "payment": { "entity": { "id": "pay_r1", "order_id": "order_ghost" } } },
    })
    .to_string();
    let (status, reply) = deliver_webhook(&app, &stray, &webhook_signature(&stray)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["status"], "unknown");

    // The gateway retries the same event against the order it settles
    let body = json!({
        "event": "payment.captured",
        "event_id": "evt_retry",
        "payload": { "payment": { "entity": { "id": "pay_r1", "order_id": gw_id } } },
    })
    .to_string();
    let (status, reply) = deliver_webhook(&app, &body, &webhook_signature(&body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["status"], "processed", "{reply}");

    let order = state
        .storage
        .get_order(&mela_types::OrderId::parse(&order_id).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, mela_types::OrderStatus::Paid);
    assert_eq!(order.payment_id.as_deref(), Some("pay_r1"));
}

#[tokio::test]
async fn test_menu_category_is_closed_and_owned() {
    let (app, _) = test_app().await;
    let baker = signup(&app, "baker", "provider").await;
    let (status, _, _) = send(
        &app,
        Method::POST,
        "/api/v1/provider/profile",
        Some(&baker),
        Some(json!({ "category_slug": "cake-shop", "business_name": "Iyer Bakes" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Unknown storefront slug is a 400, not a lookup
    let (status, body, _) = send(
        &app,
        Method::GET,
        "/api/v1/provider/menu/grocery",
        Some(&baker),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, item, _) = send(
        &app,
        Method::POST,
        "/api/v1/provider/menu/cake-shop",
        Some(&baker),
        Some(json!({ "name": "Plum Cake", "price_minor": 45000 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let item_id = item["id"].as_str().unwrap().to_string();

    // Another provider cannot touch it
    let (rival, _) = electrician(&app, "rival").await;
    let (status, _, _) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/provider/menu/cake-shop/{item_id}"),
        Some(&rival),
        Some(json!({ "price_minor": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The item is invisible under a different category
    let (status, _, _) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/provider/menu/beauty/{item_id}"),
        Some(&baker),
        Some(json!({ "price_minor": 50000 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // "restaurants" aliases "restaurant"
    let (status, _, _) = send(&app, Method::GET, "/api/v1/menu/restaurants", None, None).await;
    assert_eq!(status, StatusCode::OK);
}
