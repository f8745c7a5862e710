//! Route table

use super::handlers;
use super::state::AppState;
use axum::routing::{get, patch, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the `/api/v1` router
pub fn build_router(state: AppState, enable_cors: bool) -> Router {
    let api = Router::new()
        // Auth
        .route("/auth/signup", post(handlers::auth::signup))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/me", get(handlers::auth::me))
        // Catalog
        .route("/categories", get(handlers::catalog::list_categories))
        .route(
            "/categories/:slug/problems",
            get(handlers::catalog::list_problems),
        )
        .route("/providers", get(handlers::catalog::list_providers))
        .route("/providers/:id", get(handlers::catalog::get_provider))
        .route(
            "/providers/:id/reviews",
            get(handlers::reviews::list_for_provider),
        )
        .route(
            "/provider/profile",
            get(handlers::catalog::get_own_profile).post(handlers::catalog::create_profile),
        )
        .route(
            "/grocery-products",
            get(handlers::catalog::list_grocery_products),
        )
        // Provider menus
        .route(
            "/provider/menu/:category",
            get(handlers::menu::list_own_items).post(handlers::menu::create_item),
        )
        .route(
            "/provider/menu/:category/:item_id",
            put(handlers::menu::update_item).delete(handlers::menu::delete_item),
        )
        .route("/menu/:category", get(handlers::menu::list_public_items))
        // Bookings
        .route(
            "/bookings",
            get(handlers::bookings::list_own).post(handlers::bookings::create),
        )
        .route("/provider/bookings", get(handlers::bookings::list_for_provider))
        .route("/bookings/:id/status", patch(handlers::bookings::change_status))
        .route(
            "/bookings/:id/generate-otp",
            post(handlers::bookings::generate_otp),
        )
        .route(
            "/bookings/:id/verify-otp",
            post(handlers::bookings::verify_otp),
        )
        .route(
            "/bookings/:id/create-invoice",
            post(handlers::bookings::create_invoice),
        )
        .route("/bookings/:id/invoice", get(handlers::bookings::get_invoice))
        // Orders
        .route(
            "/orders",
            get(handlers::orders::list_own).post(handlers::orders::create),
        )
        .route("/orders/:id", get(handlers::orders::get_one))
        // Payments
        .route("/payments/order", post(handlers::payments::create_gateway_order))
        .route("/payments/verify", post(handlers::payments::verify))
        .route("/payments/webhook", post(handlers::payments::webhook))
        // Reviews
        .route("/reviews", post(handlers::reviews::create))
        // Rentals
        .route(
            "/rentals",
            get(handlers::rentals::list).post(handlers::rentals::create),
        )
        .route(
            "/rentals/:id",
            get(handlers::rentals::get_one).delete(handlers::rentals::delete),
        )
        // Table bookings
        .route(
            "/table-bookings",
            get(handlers::tables::list_own).post(handlers::tables::create),
        )
        .route(
            "/table-bookings/:id/status",
            patch(handlers::tables::change_status),
        )
        // Health
        .route("/health", get(handlers::health::health));

    let mut router = Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if enable_cors {
        router = router.layer(CorsLayer::permissive());
    }

    router
}
