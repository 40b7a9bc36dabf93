use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{delete, get, patch, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

fn cors(origin: Option<&str>) -> CorsLayer {
    match origin.and_then(|o| o.parse::<HeaderValue>().ok()) {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::permissive(),
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors(state.config.cors_allow_origin.as_deref());

    Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/bookings",
            post(handlers::bookings::create_booking).get(handlers::bookings::list_bookings),
        )
        .route("/bookings/:id", patch(handlers::bookings::update_status))
        .route(
            "/bookings/:id/complete",
            post(handlers::bookings::complete_booking),
        )
        .route("/providers", get(handlers::providers::list_providers))
        .route("/providers/:id", get(handlers::providers::get_provider))
        .route(
            "/providers/:id/schedule",
            patch(handlers::providers::update_schedule),
        )
        .route("/providers/:id/slots", get(handlers::providers::get_slots))
        .route(
            "/chat",
            get(handlers::chat::get_messages).post(handlers::chat::post_message),
        )
        .route("/api/admin/bookings", get(handlers::admin::get_bookings))
        .route(
            "/api/admin/bookings/:id",
            delete(handlers::admin::delete_booking),
        )
        .route(
            "/api/admin/bookings/:id/cancel",
            post(handlers::admin::cancel_booking),
        )
        .route("/api/admin/users", get(handlers::admin::get_users))
        .route("/api/admin/users/:id", put(handlers::admin::upsert_user))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
