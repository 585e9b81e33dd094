use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use ride_core::{AccountCategory, Notification, User};

use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::auth::TokenKind;
use crate::dto::*;
use crate::error::{AppError, AuthError};
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 8;

const RESET_REQUESTED: &str = "if your email is registered, you will receive a password reset link";

fn check_password_len(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Sends mail off the request path; failures are logged only.
fn notify_in_background(state: &AppState, recipient: String, notification: Notification) {
    let notifier = state.notifier.clone();
    tokio::spawn(async move {
        let subject = notification.subject();
        if let Err(e) = notifier.notify(&recipient, notification).await {
            tracing::error!("Failed to send \"{subject}\" to {recipient}: {e}");
        }
    });
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>), AppError> {
    if body.category == AccountCategory::Admin {
        return Err(AppError::BadRequest(
            "admin accounts cannot be self-registered".to_string(),
        ));
    }
    check_password_len(&body.password)?;

    let hash = hash_password_blocking(body.password).await?;
    let user = User::new(body.name, &body.email, body.phone, hash, body.category)?;
    state.users.create(user.clone()).await?;
    tracing::info!(user_id = %user.id, category = %user.category, "user registered");

    if let Some(token) = user.verify_token.clone() {
        notify_in_background(&state, user.email.clone(), Notification::Verification { token });
    }

    let tokens = state.tokens.issue_pair(&user.id, user.category)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(AuthResponse { user, tokens })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, AppError> {
    let Some(user) = state.users.find_by_email(&body.email).await? else {
        tracing::warn!("Failed login attempt for unknown email");
        return Err(AppError::InvalidCredentials);
    };

    let valid = verify_password_blocking(user.password_hash.clone(), body.password).await?;
    if !valid {
        tracing::warn!(user_id = %user.id, "Failed login attempt: invalid password");
        return Err(AppError::InvalidCredentials);
    }

    tracing::info!(user_id = %user.id, "login succeeded");
    let tokens = state.tokens.issue_pair(&user.id, user.category)?;
    Ok(Json(ApiResponse::ok(AuthResponse { user, tokens })))
}

/// Exchanges a refresh token for a new pair. The subject goes through the
/// same principal lookup as the authentication gate, so deleted accounts
/// cannot refresh and category changes take effect.
pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<ApiResponse<RefreshResponse>>, AppError> {
    let claims = state.tokens.verify(&body.refresh_token, TokenKind::Refresh)?;

    let principal = state
        .lookup
        .lookup(&claims.sub)
        .await?
        .ok_or(AuthError::PrincipalNotFound)?;

    let tokens = state.tokens.issue_pair(&principal.id, principal.category)?;
    tracing::debug!(user_id = %principal.id, "token pair refreshed");
    Ok(Json(ApiResponse::ok(RefreshResponse {
        user: principal,
        tokens,
    })))
}

pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyEmailQuery>,
) -> Result<Json<ApiResponse<MessageResponse>>, AppError> {
    let token = query
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest("verification token is required".to_string()))?;

    state.accounts.verify_email(&token).await?;
    Ok(Json(ApiResponse::ok(MessageResponse {
        message: "email verified successfully",
    })))
}

/// Answers identically for known and unknown addresses.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, AppError> {
    if let Some((user, token)) = state.accounts.request_password_reset(&body.email).await? {
        notify_in_background(&state, user.email, Notification::PasswordReset { token });
    }
    Ok(Json(ApiResponse::ok(MessageResponse {
        message: RESET_REQUESTED,
    })))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, AppError> {
    check_password_len(&body.new_password)?;

    let hash = hash_password_blocking(body.new_password).await?;
    let user = state.accounts.reset_password(&body.token, hash).await?;
    tracing::info!(user_id = %user.id, "password changed via reset token");
    Ok(Json(ApiResponse::ok(MessageResponse {
        message: "password reset successfully",
    })))
}
