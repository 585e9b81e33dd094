use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::unix_now;
use crate::error::CoreError;

/// Account category used for authorization decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountCategory {
    Rider,
    Driver,
    Admin,
}

impl AccountCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rider => "rider",
            Self::Driver => "driver",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for AccountCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rider" => Ok(Self::Rider),
            "driver" => Ok(Self::Driver),
            "admin" => Ok(Self::Admin),
            other => Err(CoreError::InvalidInput(format!(
                "unknown account category: {other}"
            ))),
        }
    }
}

/// Lifetime of a password-reset token.
pub const RESET_TOKEN_TTL_SECS: u64 = 3600;

/// A registered account.
///
/// The password hash is an opaque PHC string produced by the web layer's
/// hashing utility. It and the one-time tokens are never serialised.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub category: AccountCategory,
    pub is_email_verified: bool,
    #[serde(skip_serializing)]
    pub verify_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_token: Option<String>,
    /// Unix seconds after which `reset_token` is no longer accepted.
    #[serde(skip_serializing)]
    pub reset_expires: Option<u64>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl User {
    /// Builds a new, unverified user with a fresh identifier and email
    /// verification token.
    ///
    /// Email addresses are normalised to lowercase so lookups are
    /// case-insensitive.
    pub fn new(
        name: impl Into<String>,
        email: &str,
        phone: impl Into<String>,
        password_hash: impl Into<String>,
        category: AccountCategory,
    ) -> Result<Self, CoreError> {
        let name = name.into();
        let phone = phone.into();
        let email = email.trim().to_lowercase();

        if name.trim().is_empty() {
            return Err(CoreError::InvalidInput("name is required".to_string()));
        }
        if !email.contains('@') {
            return Err(CoreError::InvalidInput("email is invalid".to_string()));
        }
        if phone.trim().is_empty() {
            return Err(CoreError::InvalidInput("phone is required".to_string()));
        }

        let now = unix_now();
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            email,
            phone,
            password_hash: password_hash.into(),
            category,
            is_email_verified: false,
            verify_token: Some(uuid::Uuid::new_v4().to_string()),
            reset_token: None,
            reset_expires: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_driver(&self) -> bool {
        self.category == AccountCategory::Driver
    }

    pub fn is_rider(&self) -> bool {
        self.category == AccountCategory::Rider
    }

    /// Marks the email as verified and consumes the verification token.
    pub fn mark_email_verified(&mut self) {
        self.is_email_verified = true;
        self.verify_token = None;
        self.updated_at = unix_now();
    }

    /// Issues a fresh reset token valid for [`RESET_TOKEN_TTL_SECS`] from
    /// `now`, replacing any earlier one.
    pub fn begin_password_reset(&mut self, now: u64) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        self.reset_token = Some(token.clone());
        self.reset_expires = Some(now.saturating_add(RESET_TOKEN_TTL_SECS));
        self.updated_at = now;
        token
    }

    /// True while the reset token has not passed its expiry at `now`.
    pub fn reset_token_live(&self, now: u64) -> bool {
        self.reset_token.is_some() && self.reset_expires.is_some_and(|exp| now <= exp)
    }

    /// Stores the new hash and consumes the reset token.
    pub fn complete_password_reset(&mut self, password_hash: impl Into<String>, now: u64) {
        self.password_hash = password_hash.into();
        self.reset_token = None;
        self.reset_expires = None;
        self.updated_at = now;
    }
}
