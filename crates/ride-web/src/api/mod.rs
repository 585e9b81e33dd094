mod auth_handlers;
mod drivers;

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::Json;
use axum::Router;
use ride_core::{AccountCategory, User};

use crate::auth::{CurrentPrincipal, Guard, Principal};
use crate::dto::{ApiResponse, HealthResponse};
use crate::error::AppError;
use crate::pipeline::Pipeline;
use crate::state::AppState;

/// Routes reachable without a credential.
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth_handlers::register))
        .route("/auth/login", post(auth_handlers::login))
        .route("/auth/refresh", post(auth_handlers::refresh))
        .route("/auth/verify-email", get(auth_handlers::verify_email))
        .route("/auth/forgot-password", post(auth_handlers::forgot_password))
        .route("/auth/reset-password", post(auth_handlers::reset_password))
}

/// Routes behind the authentication gate and, where needed, a category guard.
pub fn protected_router(state: &AppState) -> Router<AppState> {
    let gate = state.gate();

    let account = Pipeline::authenticated(gate.clone())
        .apply(
            Router::new()
                .route("/users/me", get(me))
                .route("/users/{id}", get(user_by_id)),
        );

    let drivers = Pipeline::authenticated(gate.clone())
        .require(Guard::category(AccountCategory::Driver))
        .apply(
            Router::new()
                .route("/drivers/verify", post(drivers::submit_verification))
                .route("/drivers/location", put(drivers::update_location))
                .route("/drivers/availability", put(drivers::update_availability))
                .route("/drivers/profile", get(drivers::profile))
                .route("/drivers/documents", get(drivers::documents)),
        );

    let admin = Pipeline::authenticated(gate)
        .require(Guard::category(AccountCategory::Admin))
        .apply(Router::new().route(
            "/admin/drivers/{id}/verification",
            put(drivers::set_verification),
        ));

    account.merge(drivers).merge(admin)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn me(CurrentPrincipal(principal): CurrentPrincipal) -> Json<ApiResponse<Principal>> {
    Json(ApiResponse::ok(principal))
}

async fn user_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let user = state.accounts.find(&id).await?;
    Ok(Json(ApiResponse::ok(user)))
}
