use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use ride_core::{CoreError, Document, Driver};

use crate::auth::CurrentPrincipal;
use crate::dto::*;
use crate::error::AppError;
use crate::state::AppState;

pub async fn submit_verification(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Json(body): Json<VerifyDriverRequest>,
) -> Result<(StatusCode, Json<ApiResponse<VerificationSubmitted>>), AppError> {
    let user = state
        .users
        .find_by_id(&principal.id)
        .await?
        .ok_or(CoreError::UserNotFound)?;

    let driver = state.drivers.onboard(&user, body.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(VerificationSubmitted::from(&driver))),
    ))
}

pub async fn update_location(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Json(body): Json<UpdateLocationRequest>,
) -> Result<Json<ApiResponse<Driver>>, AppError> {
    let driver = state
        .drivers
        .update_location(&principal.id, body.latitude, body.longitude)
        .await?;
    Ok(Json(ApiResponse::ok(driver)))
}

pub async fn update_availability(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Json(body): Json<UpdateAvailabilityRequest>,
) -> Result<Json<ApiResponse<Driver>>, AppError> {
    let driver = state
        .drivers
        .set_availability(&principal.id, body.is_available)
        .await?;
    Ok(Json(ApiResponse::ok(driver)))
}

pub async fn profile(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<Json<ApiResponse<Driver>>, AppError> {
    Ok(Json(ApiResponse::ok(
        state.drivers.profile(&principal.id).await?,
    )))
}

pub async fn documents(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<Json<ApiResponse<Vec<Document>>>, AppError> {
    Ok(Json(ApiResponse::ok(
        state.drivers.documents(&principal.id).await?,
    )))
}

/// Admin decision on a pending driver.
pub async fn set_verification(
    State(state): State<AppState>,
    CurrentPrincipal(admin): CurrentPrincipal,
    Path(driver_id): Path<String>,
    Json(body): Json<SetVerificationRequest>,
) -> Result<Json<ApiResponse<Driver>>, AppError> {
    let driver = state.drivers.set_verified(&driver_id, body.verified).await?;
    tracing::info!(admin_id = %admin.id, driver_id = %driver.id, verified = body.verified, "verification decided");
    Ok(Json(ApiResponse::ok(driver)))
}
