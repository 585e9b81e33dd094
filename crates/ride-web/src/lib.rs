//! HTTP front end for the Share a Ride backend.
//!
//! Requests pass through a fixed pipeline: a per-client sliding-window
//! [rate governor](middleware::rate_limit::RateGovernor), then for protected
//! routes the [authentication gate](auth::gate) and any
//! [authorization guards](auth::guard), then the handler.

pub mod api;
pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod pipeline;
pub mod state;

use axum::http::{header, Method};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Builds the full application router.
pub fn app(state: AppState) -> Router {
    // CORS: same-origin only by default (no cross-origin requests allowed)
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let routes = api::public_router().merge(api::protected_router(&state));
    let governed = pipeline::governed(routes, state.governor.clone());

    Router::new()
        .nest("/api", governed)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}
