//! Account lifecycle: email verification and password resets.
//!
//! Password hashing stays with the caller; this service only moves the
//! one-time tokens through their states.

use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::model::unix_now;
use crate::model::user::User;
use crate::repo::UserRepository;

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub async fn find(&self, user_id: &str) -> CoreResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(CoreError::UserNotFound)
    }

    /// Consumes an email verification token.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidVerificationToken`] if no account holds `token`,
    /// including one that was already used.
    pub async fn verify_email(&self, token: &str) -> CoreResult<User> {
        let mut user = self
            .users
            .find_by_verify_token(token)
            .await?
            .ok_or(CoreError::InvalidVerificationToken)?;
        user.mark_email_verified();
        self.users.update(user.clone()).await?;
        tracing::info!(user_id = %user.id, "email verified");
        Ok(user)
    }

    pub async fn request_password_reset(&self, email: &str) -> CoreResult<Option<(User, String)>> {
        self.request_password_reset_at(email, unix_now()).await
    }

    /// Starts a reset for the account registered under `email`.
    ///
    /// Returns `None` for unknown addresses so callers can answer the same
    /// way whether or not the account exists.
    pub async fn request_password_reset_at(
        &self,
        email: &str,
        now: u64,
    ) -> CoreResult<Option<(User, String)>> {
        let Some(mut user) = self.users.find_by_email(email).await? else {
            tracing::debug!("password reset requested for unknown email");
            return Ok(None);
        };
        let token = user.begin_password_reset(now);
        self.users.update(user.clone()).await?;
        tracing::info!(user_id = %user.id, "password reset requested");
        Ok(Some((user, token)))
    }

    pub async fn reset_password(&self, token: &str, password_hash: String) -> CoreResult<User> {
        self.reset_password_at(token, password_hash, unix_now()).await
    }

    /// Replaces the password of the account holding a live reset token.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidResetToken`] if the token is unknown or expired.
    pub async fn reset_password_at(
        &self,
        token: &str,
        password_hash: String,
        now: u64,
    ) -> CoreResult<User> {
        let mut user = self
            .users
            .find_by_reset_token(token)
            .await?
            .filter(|u| u.reset_token_live(now))
            .ok_or(CoreError::InvalidResetToken)?;
        user.complete_password_reset(password_hash, now);
        self.users.update(user.clone()).await?;
        tracing::info!(user_id = %user.id, "password reset completed");
        Ok(user)
    }
}
