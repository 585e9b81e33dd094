//! Persistence capabilities consumed by services and the web layer.
//!
//! Implementations must be safe to share across request tasks. The
//! [`memory`] module provides process-local implementations used by the
//! binary and by tests.

pub mod memory;

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::model::driver::Driver;
use crate::model::user::User;

pub use memory::{InMemoryDriverRepository, InMemoryUserRepository};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Stores a new user.
    ///
    /// # Errors
    ///
    /// - [`CoreError::EmailTaken`](crate::CoreError::EmailTaken) / [`CoreError::PhoneTaken`](crate::CoreError::PhoneTaken)
    ///   if another account already uses the email or phone.
    async fn create(&self, user: User) -> CoreResult<()>;

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> CoreResult<Option<User>>;

    async fn find_by_phone(&self, phone: &str) -> CoreResult<Option<User>>;

    /// Finds the user holding an outstanding email verification token.
    async fn find_by_verify_token(&self, token: &str) -> CoreResult<Option<User>>;

    /// Finds the user holding a password-reset token, expired or not.
    async fn find_by_reset_token(&self, token: &str) -> CoreResult<Option<User>>;

    /// Replaces the stored user with the same id.
    async fn update(&self, user: User) -> CoreResult<()>;
}

#[async_trait]
pub trait DriverRepository: Send + Sync {
    /// Stores a new driver record.
    ///
    /// # Errors
    ///
    /// - [`CoreError::DriverExists`](crate::CoreError::DriverExists) if the user already has a record.
    /// - [`CoreError::LicenseTaken`](crate::CoreError::LicenseTaken) if the licence number is in use.
    async fn create(&self, driver: Driver) -> CoreResult<()>;

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<Driver>>;

    async fn find_by_user_id(&self, user_id: &str) -> CoreResult<Option<Driver>>;

    async fn find_by_license_number(&self, license_number: &str) -> CoreResult<Option<Driver>>;

    /// Replaces the stored driver with the same id.
    async fn update(&self, driver: Driver) -> CoreResult<()>;
}
