//! Access/refresh token issuance and verification.
//!
//! Tokens are HS256 JWTs. Each [`TokenKind`] has its own signing secret, and
//! the kind is embedded in the signed payload, so possession of one key
//! cannot mint tokens of the other kind and a token of one kind is never
//! accepted where the other is required.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use ride_core::AccountCategory;
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::error::AuthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signed payload of every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub category: AccountCategory,
    pub kind: TokenKind,
    /// Issued at, Unix seconds.
    pub iat: u64,
    /// Expiry, Unix seconds. Valid up to and including this instant.
    pub exp: u64,
    pub iss: String,
    pub jti: String,
}

impl Claims {
    /// `None` when `exp` lies beyond what `SystemTime` can represent.
    pub fn expires_at(&self) -> Option<SystemTime> {
        UNIX_EPOCH.checked_add(Duration::from_secs(self.exp))
    }
}

/// Freshly minted access/refresh credentials.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access-token lifetime in seconds.
    pub expires_in: u64,
}

/// Only the kind is read before the signature is checked.
#[derive(Deserialize)]
struct DeclaredKind {
    kind: TokenKind,
}

struct SigningKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SigningKey {
    fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }
}

struct Keys {
    access: SigningKey,
    refresh: SigningKey,
    issuer: String,
    validation: Validation,
    peek: Validation,
}

/// Stateless token service; cheap to clone and safe to share.
#[derive(Clone)]
pub struct TokenService {
    keys: Arc<Keys>,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against an explicit clock in `verify_at`.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_issuer(&[&config.issuer]);
        validation.required_spec_claims = ["exp", "iat", "sub", "iss"]
            .into_iter()
            .map(String::from)
            .collect::<HashSet<_>>();

        let mut peek = Validation::new(Algorithm::HS256);
        peek.insecure_disable_signature_validation();
        peek.validate_exp = false;
        peek.validate_aud = false;
        peek.required_spec_claims = HashSet::new();

        Self {
            keys: Arc::new(Keys {
                access: SigningKey::new(&config.access_secret, config.access_ttl()),
                refresh: SigningKey::new(&config.refresh_secret, config.refresh_ttl()),
                issuer: config.issuer.clone(),
                validation,
                peek,
            }),
        }
    }

    fn key(&self, kind: TokenKind) -> &SigningKey {
        match kind {
            TokenKind::Access => &self.keys.access,
            TokenKind::Refresh => &self.keys.refresh,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.keys.access.ttl
    }

    pub fn issue_access(&self, subject: &str, category: AccountCategory) -> Result<String, AuthError> {
        self.issue_at(TokenKind::Access, subject, category, SystemTime::now())
    }

    pub fn issue_refresh(&self, subject: &str, category: AccountCategory) -> Result<String, AuthError> {
        self.issue_at(TokenKind::Refresh, subject, category, SystemTime::now())
    }

    pub fn issue_pair(&self, subject: &str, category: AccountCategory) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.issue_access(subject, category)?,
            refresh_token: self.issue_refresh(subject, category)?,
            token_type: "Bearer",
            expires_in: self.access_ttl().as_secs(),
        })
    }

    /// Signs a claim set of `kind` as if issued at `now`.
    pub fn issue_at(
        &self,
        kind: TokenKind,
        subject: &str,
        category: AccountCategory,
        now: SystemTime,
    ) -> Result<String, AuthError> {
        let key = self.key(kind);
        let iat = now
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AuthError::Internal(format!("clock before Unix epoch: {e}")))?
            .as_secs();

        let exp = iat
            .checked_add(key.ttl.as_secs())
            .ok_or_else(|| AuthError::Internal(format!("{kind} token expiry overflows")))?;

        let claims = Claims {
            sub: subject.to_string(),
            category,
            kind,
            iat,
            exp,
            iss: self.keys.issuer.clone(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &key.encoding)
            .map_err(|e| AuthError::Internal(format!("failed to sign {kind} token: {e}")))
    }

    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, AuthError> {
        self.verify_at(token, expected, SystemTime::now())
    }

    /// Verifies `token` as a credential of kind `expected` at instant `now`.
    ///
    /// The signature is checked under the key of the token's declared kind,
    /// then the kind, then expiry. An authentic token of the wrong kind
    /// reports `KindMismatch` whether or not it has also expired.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidSignature`] for forged, tampered or unparsable tokens.
    /// - [`AuthError::KindMismatch`] when the token is of the other kind.
    /// - [`AuthError::Expired`] when `now` is strictly after `exp`.
    pub fn verify_at(
        &self,
        token: &str,
        expected: TokenKind,
        now: SystemTime,
    ) -> Result<Claims, AuthError> {
        let declared = decode::<DeclaredKind>(token, &self.key(expected).decoding, &self.keys.peek)
            .map_err(|e| {
                tracing::debug!(error = %e, "token payload unreadable");
                AuthError::InvalidSignature
            })?
            .claims
            .kind;

        let claims = decode::<Claims>(token, &self.key(declared).decoding, &self.keys.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, kind = %declared, "token rejected");
                AuthError::InvalidSignature
            })?
            .claims;

        let expires_at = match claims.expires_at() {
            Some(at) if claims.exp > claims.iat => at,
            _ => {
                tracing::debug!(iat = claims.iat, exp = claims.exp, "token carries implausible expiry");
                return Err(AuthError::InvalidSignature);
            }
        };
        if claims.kind != expected {
            return Err(AuthError::KindMismatch { expected });
        }
        if now > expires_at {
            return Err(AuthError::Expired);
        }
        Ok(claims)
    }
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("issuer", &self.keys.issuer)
            .field("access_ttl", &self.keys.access.ttl)
            .field("refresh_ttl", &self.keys.refresh.ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig {
            access_secret: "access-secret-access-secret-access".to_string(),
            refresh_secret: "refresh-secret-refresh-secret-refresh".to_string(),
            access_ttl_secs: 900,
            refresh_ttl_secs: 7 * 24 * 3600,
            issuer: "share-a-ride".to_string(),
        }
    }

    fn service() -> TokenService {
        TokenService::new(&config())
    }

    fn t0() -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    #[test]
    fn access_round_trip() {
        let svc = service();
        for (sub, category) in [
            ("u-1", AccountCategory::Rider),
            ("u-2", AccountCategory::Driver),
            ("u-3", AccountCategory::Admin),
        ] {
            let token = svc.issue_access(sub, category).unwrap();
            let claims = svc.verify(&token, TokenKind::Access).unwrap();
            assert_eq!(claims.sub, sub);
            assert_eq!(claims.category, category);
            assert_eq!(claims.kind, TokenKind::Access);
            assert!(claims.exp > claims.iat);
        }
    }

    #[test]
    fn refresh_round_trip_uses_refresh_ttl() {
        let svc = service();
        let token = svc
            .issue_at(TokenKind::Refresh, "u-1", AccountCategory::Rider, t0())
            .unwrap();
        let claims = svc.verify_at(&token, TokenKind::Refresh, t0()).unwrap();
        assert_eq!(claims.kind, TokenKind::Refresh);
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 3600);
    }

    #[test]
    fn access_token_rejected_as_refresh() {
        let svc = service();
        let token = svc.issue_access("u-1", AccountCategory::Rider).unwrap();
        assert_eq!(
            svc.verify(&token, TokenKind::Refresh).unwrap_err(),
            AuthError::KindMismatch {
                expected: TokenKind::Refresh
            }
        );
    }

    #[test]
    fn refresh_token_rejected_as_access() {
        let svc = service();
        let token = svc.issue_refresh("u-1", AccountCategory::Driver).unwrap();
        assert_eq!(
            svc.verify(&token, TokenKind::Access).unwrap_err(),
            AuthError::KindMismatch {
                expected: TokenKind::Access
            }
        );
    }

    #[test]
    fn wrong_kind_is_reported_even_when_expired() {
        let svc = service();
        let token = svc
            .issue_at(TokenKind::Access, "u-1", AccountCategory::Rider, t0())
            .unwrap();
        let later = t0() + Duration::from_secs(3600);
        assert_eq!(
            svc.verify_at(&token, TokenKind::Access, later).unwrap_err(),
            AuthError::Expired
        );
        assert_eq!(
            svc.verify_at(&token, TokenKind::Refresh, later).unwrap_err(),
            AuthError::KindMismatch {
                expected: TokenKind::Refresh
            }
        );
    }

    #[test]
    fn overflowing_ttl_fails_to_issue() {
        let mut unbounded = config();
        unbounded.refresh_ttl_secs = u64::MAX;
        let svc = TokenService::new(&unbounded);
        assert!(matches!(
            svc.issue_at(TokenKind::Refresh, "u-1", AccountCategory::Rider, t0()),
            Err(AuthError::Internal(_))
        ));
        assert!(svc.issue_access("u-1", AccountCategory::Rider).is_ok());
    }

    #[test]
    fn unrepresentable_expiry_is_invalid() {
        let claims = Claims {
            sub: "u-1".to_string(),
            category: AccountCategory::Rider,
            kind: TokenKind::Access,
            iat: 1_700_000_000,
            exp: u64::MAX,
            iss: "share-a-ride".to_string(),
            jti: "j".to_string(),
        };
        let key = EncodingKey::from_secret(config().access_secret.as_bytes());
        let token = encode(&Header::new(Algorithm::HS256), &claims, &key).unwrap();
        assert_eq!(
            service().verify_at(&token, TokenKind::Access, t0()).unwrap_err(),
            AuthError::InvalidSignature
        );
    }

    #[test]
    fn expiry_is_inclusive() {
        let svc = service();
        let token = svc
            .issue_at(TokenKind::Access, "u-1", AccountCategory::Rider, t0())
            .unwrap();
        let expiry = t0() + Duration::from_secs(900);

        assert!(svc.verify_at(&token, TokenKind::Access, expiry).is_ok());
        assert_eq!(
            svc.verify_at(&token, TokenKind::Access, expiry + Duration::from_millis(1))
                .unwrap_err(),
            AuthError::Expired
        );
    }

    #[test]
    fn expired_refresh_token() {
        let svc = service();
        let token = svc
            .issue_at(TokenKind::Refresh, "u-1", AccountCategory::Rider, t0())
            .unwrap();
        let later = t0() + Duration::from_secs(8 * 24 * 3600);
        assert_eq!(
            svc.verify_at(&token, TokenKind::Refresh, later).unwrap_err(),
            AuthError::Expired
        );
    }

    #[test]
    fn token_from_other_secret_is_invalid() {
        let mut other = config();
        other.access_secret = "a-completely-different-access-secret".to_string();
        let forged = TokenService::new(&other)
            .issue_access("u-1", AccountCategory::Admin)
            .unwrap();
        assert_eq!(
            service().verify(&forged, TokenKind::Access).unwrap_err(),
            AuthError::InvalidSignature
        );
    }

    #[test]
    fn refresh_claims_signed_with_access_key_are_invalid() {
        // Holder of the access key tries to mint a refresh token.
        let mut leaked = config();
        leaked.refresh_secret = leaked.access_secret.clone();
        let forged = TokenService::new(&leaked)
            .issue_refresh("u-1", AccountCategory::Rider)
            .unwrap();
        assert_eq!(
            service().verify(&forged, TokenKind::Refresh).unwrap_err(),
            AuthError::InvalidSignature
        );
    }

    #[test]
    fn tampered_payload_is_invalid() {
        let svc = service();
        let token = svc.issue_access("u-1", AccountCategory::Rider).unwrap();
        let mut parts: Vec<String> = token.split('.').map(String::from).collect();
        let other = svc.issue_access("u-2", AccountCategory::Admin).unwrap();
        parts[1] = other.split('.').nth(1).unwrap().to_string();
        let tampered = parts.join(".");
        assert_eq!(
            svc.verify(&tampered, TokenKind::Access).unwrap_err(),
            AuthError::InvalidSignature
        );
    }

    #[test]
    fn garbage_is_invalid() {
        let svc = service();
        for token in ["", "abc", "a.b.c", "xyz.xyz"] {
            assert_eq!(
                svc.verify(token, TokenKind::Access).unwrap_err(),
                AuthError::InvalidSignature,
                "token {token:?}"
            );
        }
    }

    #[test]
    fn wrong_issuer_is_invalid() {
        let mut other = config();
        other.issuer = "someone-else".to_string();
        let token = TokenService::new(&other)
            .issue_access("u-1", AccountCategory::Rider)
            .unwrap();
        assert_eq!(
            service().verify(&token, TokenKind::Access).unwrap_err(),
            AuthError::InvalidSignature
        );
    }

    #[test]
    fn pair_contains_both_kinds() {
        let svc = service();
        let pair = svc.issue_pair("u-1", AccountCategory::Driver).unwrap();
        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, 900);
        assert!(svc.verify(&pair.access_token, TokenKind::Access).is_ok());
        assert!(svc.verify(&pair.refresh_token, TokenKind::Refresh).is_ok());
    }

    #[test]
    fn each_token_is_unique() {
        let svc = service();
        let a = svc.issue_at(TokenKind::Access, "u", AccountCategory::Rider, t0()).unwrap();
        let b = svc.issue_at(TokenKind::Access, "u", AccountCategory::Rider, t0()).unwrap();
        assert_ne!(a, b);
    }
}
