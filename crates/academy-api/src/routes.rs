//! # Routes
//!
//! Axum router configuration for the academy API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Largest webhook body accepted
pub const WEBHOOK_BODY_LIMIT: usize = 64 * 1024;

/// Create the main application router
///
/// Routes:
/// - Accounts:
///   - POST /users - Register
///   - POST /signin - Issue a bearer token
///   - GET  /users/{id} - Profile (bearer)
///
/// - Catalog:
///   - GET /courses, /courses/{id}, /courses/{id}/trainings, /trainings/{id}
///
/// - Cards (bearer unless noted):
///   - POST /users/{id}/card - Ephemeral key + setup intent
///   - GET  /users/{id}/cards - Cards saved at the gateway (public)
///   - POST /users/{id}/cards - Save a payment method
///   - GET  /cards/{card_id}
///
/// - Payments (bearer):
///   - POST /users/{id}/cards/{paym_id}/authorize
///   - POST /payment/{payment_id}/capture
///   - GET  /payment/{payment_id}
///
/// - Webhooks:
///   - POST /stripe/webhook
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let account_routes = Router::new()
        .route("/users", post(handlers::create_user))
        .route("/signin", post(handlers::signin))
        .route("/users/{id}", get(handlers::get_user));

    let catalog_routes = Router::new()
        .route("/courses", get(handlers::list_courses))
        .route("/courses/{id}", get(handlers::get_course))
        .route("/courses/{id}/trainings", get(handlers::list_trainings))
        .route("/trainings/{id}", get(handlers::get_training));

    let card_routes = Router::new()
        .route("/users/{id}/card", post(handlers::setup_card))
        .route(
            "/users/{id}/cards",
            get(handlers::list_cards).post(handlers::add_card),
        )
        .route("/cards/{card_id}", get(handlers::get_card));

    let payment_routes = Router::new()
        .route(
            "/users/{id}/cards/{paym_id}/authorize",
            post(handlers::authorize_payment),
        )
        .route("/payment/{payment_id}/capture", post(handlers::capture_payment))
        .route("/payment/{payment_id}", get(handlers::get_payment));

    // Raw body, signature checked in the handler
    let webhook_routes = Router::new()
        .route("/stripe/webhook", post(handlers::stripe_webhook))
        .layer(DefaultBodyLimit::max(WEBHOOK_BODY_LIMIT));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(account_routes)
        .merge(catalog_routes)
        .merge(card_routes)
        .merge(payment_routes)
        .merge(webhook_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
