//! Error types for `ride-core`.
//!
//! All fallible domain operations return [`CoreResult<T>`], which is an
//! alias for `Result<T, CoreError>`.

/// Unified error type for domain operations.
///
/// Each variant carries just enough context for the HTTP layer to pick a
/// status code and a caller-facing message.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    /// No user exists with the given identifier, email or phone.
    #[error("user not found")]
    UserNotFound,

    /// No driver record exists for the given identifier or user.
    #[error("driver not found")]
    DriverNotFound,

    /// Another account already uses this email address.
    #[error("email already exists")]
    EmailTaken,

    /// Another account already uses this phone number.
    #[error("phone already exists")]
    PhoneTaken,

    /// The user has already submitted driver onboarding.
    #[error("driver already exists")]
    DriverExists,

    /// Another driver already registered this licence number.
    #[error("license number already exists")]
    LicenseTaken,

    /// Driver-only operation attempted by a non-driver account.
    #[error("account is not a driver")]
    NotADriver,

    /// The driver has not been verified by an administrator yet.
    #[error("driver not verified")]
    DriverNotVerified,

    /// No account holds this email verification token.
    #[error("invalid verification token")]
    InvalidVerificationToken,

    /// The password-reset token is unknown or past its expiry.
    #[error("invalid or expired reset token")]
    InvalidResetToken,

    /// Coordinates outside the valid latitude/longitude range.
    #[error("invalid location coordinates")]
    InvalidLocation,

    /// A request field failed a domain-level check.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The backing store failed.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Convenience alias used throughout `ride-core`.
pub type CoreResult<T> = Result<T, CoreError>;
