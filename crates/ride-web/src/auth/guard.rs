//! Category-based authorization.

use std::fmt;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use ride_core::AccountCategory;

use super::gate::current_principal;
use super::principal::Principal;
use crate::error::AuthError;
use crate::pipeline::Stage;

type Predicate = dyn Fn(AccountCategory) -> bool + Send + Sync;

/// A predicate over the principal's account category.
///
/// Guards are stateless and only ever run after the authentication gate.
#[derive(Clone)]
pub struct Guard {
    name: Arc<str>,
    predicate: Arc<Predicate>,
}

impl Guard {
    /// Guard from an arbitrary predicate. `name` only shows up in logs.
    pub fn require<F>(name: impl Into<Arc<str>>, predicate: F) -> Self
    where
        F: Fn(AccountCategory) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Admits exactly one category.
    pub fn category(category: AccountCategory) -> Self {
        Self::require(category.as_str(), move |c| c == category)
    }

    /// Admits any of the listed categories.
    pub fn any_of(categories: &[AccountCategory]) -> Self {
        let allowed = categories.to_vec();
        let name = allowed
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join("|");
        Self::require(name, move |c| allowed.contains(&c))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn check(&self, principal: &Principal) -> Result<(), AuthError> {
        if (self.predicate)(principal.category) {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard").field("name", &self.name).finish()
    }
}

/// Middleware: evaluate the guard against the attached principal.
pub async fn enforce(
    State(guard): State<Guard>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let principal = current_principal(req.extensions())?;
    if let Err(err) = guard.check(principal) {
        tracing::warn!(
            stage = %Stage::Authorization,
            guard = guard.name(),
            subject = %principal.id,
            category = %principal.category,
            path = %req.uri().path(),
            "request rejected"
        );
        return Err(err);
    }
    Ok(next.run(req).await)
}
