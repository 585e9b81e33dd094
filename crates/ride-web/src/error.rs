use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use ride_core::CoreError;
use serde::Serialize;

use crate::auth::token::TokenKind;

/// Why the request pipeline refused a request.
///
/// Every variant except [`AuthError::Internal`] is an expected,
/// caller-attributable outcome. The message never includes signature-library
/// detail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing authorization header")]
    MissingCredential,

    #[error("invalid authorization header format")]
    MalformedCredential,

    #[error("token has expired")]
    Expired,

    #[error("invalid token")]
    InvalidSignature,

    #[error("expected a {expected} token")]
    KindMismatch { expected: TokenKind },

    #[error("principal not found")]
    PrincipalNotFound,

    #[error("insufficient permissions")]
    Forbidden,

    #[error("rate limit exceeded")]
    RateLimited { retry_after: Duration },

    /// Signing failure, or a guard that ran without a prior authentication
    /// stage. The payload is logged, never returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Machine-readable reason carried in the rejection body.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_header",
            Self::MalformedCredential => "malformed_header",
            Self::Expired => "expired",
            Self::InvalidSignature => "invalid_signature",
            Self::KindMismatch { .. } => "kind_mismatch",
            Self::PrincipalNotFound => "principal_not_found",
            Self::Forbidden => "forbidden",
            Self::RateLimited { .. } => "rate_limited",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

/// Handler-facing error type.
#[derive(Debug)]
pub enum AppError {
    Auth(AuthError),
    InvalidCredentials,
    BadRequest(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    reason: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
}

/// Whole seconds, rounded up, never below one.
pub(crate) fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let reason = self.reason();

        let message = match &self {
            AuthError::Internal(detail) => {
                // Log the real error server-side, return generic message to client
                tracing::error!("Internal error: {}", detail);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let retry_after = match &self {
            AuthError::RateLimited { retry_after } => Some(retry_after_secs(*retry_after)),
            _ => None,
        };

        let body = ErrorBody {
            success: false,
            error: message,
            reason,
            retry_after,
        };

        let mut response = (status, axum::Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, reason, message) = match self {
            AppError::Auth(err) => return err.into_response(),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                "Invalid credentials".to_string(),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = ErrorBody {
            success: false,
            error: message,
            reason,
            retry_after: None,
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        AppError::Auth(e)
    }
}

impl From<CoreError> for AppError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::UserNotFound
            | CoreError::DriverNotFound
            | CoreError::InvalidVerificationToken => AppError::NotFound(e.to_string()),
            CoreError::EmailTaken
            | CoreError::PhoneTaken
            | CoreError::DriverExists
            | CoreError::LicenseTaken => AppError::Conflict(e.to_string()),
            CoreError::NotADriver | CoreError::DriverNotVerified => {
                AppError::Forbidden(e.to_string())
            }
            CoreError::InvalidLocation | CoreError::InvalidInput(_) | CoreError::InvalidResetToken => {
                AppError::BadRequest(e.to_string())
            }
            CoreError::Storage(msg) => AppError::Internal(msg),
        }
    }
}

/// Keeps the full context chain for the log line written by `into_response`.
impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Internal(format!("{e:#}"))
    }
}
