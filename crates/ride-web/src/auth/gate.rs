//! Bearer-token authentication.
//!
//! [`require_auth`] is the only code that writes the per-request principal
//! slot. Downstream guards and handlers read it through [`current_principal`]
//! or the [`CurrentPrincipal`] extractor.

use std::sync::Arc;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{header, Extensions, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;

use super::principal::{Principal, PrincipalLookup};
use super::token::{TokenKind, TokenService};
use crate::error::AuthError;
use crate::pipeline::Stage;

pub const BEARER_SCHEME: &str = "Bearer";

/// Extension slot holding the authenticated principal. The field is private
/// to this module, so nothing else can forge one.
#[derive(Debug, Clone)]
struct Authenticated(Principal);

/// Verifies access tokens and resolves them to principals.
#[derive(Clone)]
pub struct AuthGate {
    tokens: TokenService,
    lookup: Arc<dyn PrincipalLookup>,
}

impl AuthGate {
    pub fn new(tokens: TokenService, lookup: Arc<dyn PrincipalLookup>) -> Self {
        Self { tokens, lookup }
    }

    /// Authenticates a request from its headers.
    ///
    /// No lock is held while the lookup capability runs.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, AuthError> {
        let token = bearer_token(headers)?;
        let claims = self.tokens.verify(token, TokenKind::Access)?;
        self.lookup
            .lookup(&claims.sub)
            .await?
            .ok_or(AuthError::PrincipalNotFound)
    }
}

/// Extracts the token from `Authorization: Bearer <token>`.
///
/// The header must have exactly two space-separated parts and the scheme
/// must be the literal `Bearer`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredential)?;
    if value.is_empty() {
        return Err(AuthError::MissingCredential);
    }
    let value = value.to_str().map_err(|_| AuthError::MalformedCredential)?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(BEARER_SCHEME), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(AuthError::MalformedCredential),
    }
}

/// Middleware: authenticate, attach the principal, continue. On failure the
/// request is answered here and nothing downstream runs.
pub async fn require_auth(
    State(gate): State<AuthGate>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let outcome = gate.authenticate(req.headers()).await;
    match outcome {
        Ok(principal) => {
            tracing::debug!(
                subject = %principal.id,
                category = %principal.category,
                "request authenticated"
            );
            req.extensions_mut().insert(Authenticated(principal));
            Ok(next.run(req).await)
        }
        Err(err) => {
            if !matches!(err, AuthError::Internal(_)) {
                tracing::warn!(
                    stage = %Stage::Authentication,
                    reason = err.reason(),
                    path = %req.uri().path(),
                    "request rejected"
                );
            }
            Err(err)
        }
    }
}

/// Reads the principal attached by [`require_auth`].
///
/// # Errors
///
/// [`AuthError::Internal`] if authentication did not run first. That is a
/// routing mistake, not a caller error.
pub fn current_principal(extensions: &Extensions) -> Result<&Principal, AuthError> {
    extensions
        .get::<Authenticated>()
        .map(|slot| &slot.0)
        .ok_or_else(|| AuthError::Internal("no principal in request context".to_string()))
}

/// Handler extractor for the authenticated principal.
pub struct CurrentPrincipal(pub Principal);

impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current_principal(&parts.extensions)
            .cloned()
            .map(CurrentPrincipal)
    }
}

#[cfg(test)]
pub(crate) fn attach_for_test(extensions: &mut Extensions, principal: Principal) {
    extensions.insert(Authenticated(principal));
}
