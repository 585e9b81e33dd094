//! The authenticated identity attached to a request.

use std::sync::Arc;

use async_trait::async_trait;
use ride_core::{AccountCategory, User, UserRepository};
use serde::Serialize;

use crate::error::AuthError;

/// Resolved caller identity. Request-scoped: built by the authentication
/// gate and dropped with the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: String,
    pub category: AccountCategory,
    pub name: String,
    pub email: String,
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            category: user.category,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Resolves a verified subject identifier to a principal.
///
/// `Ok(None)` means the subject no longer exists; `Err` is reserved for
/// lookup failures.
#[async_trait]
pub trait PrincipalLookup: Send + Sync {
    async fn lookup(&self, subject: &str) -> Result<Option<Principal>, AuthError>;
}

/// [`PrincipalLookup`] backed by the user repository.
#[derive(Clone)]
pub struct UserLookup {
    users: Arc<dyn UserRepository>,
}

impl UserLookup {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl PrincipalLookup for UserLookup {
    async fn lookup(&self, subject: &str) -> Result<Option<Principal>, AuthError> {
        let user = self
            .users
            .find_by_id(subject)
            .await
            .map_err(|e| AuthError::Internal(format!("principal lookup failed: {e}")))?;
        Ok(user.as_ref().map(Principal::from))
    }
}
