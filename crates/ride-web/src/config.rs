use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Account seeded at startup. Admins cannot self-register.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminSeed {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Public origin used in links sent by mail.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub admins: Vec<AdminSeed>,
}

/// Token issuance settings. Access and refresh tokens are signed with
/// independent secrets.
#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub access_secret: String,
    #[serde(default)]
    pub refresh_secret: String,
    #[serde(default = "default_access_ttl_secs")]
    pub access_ttl_secs: u64,
    #[serde(default = "default_refresh_ttl_secs")]
    pub refresh_ttl_secs: u64,
    #[serde(default = "default_issuer")]
    pub issuer: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access_secret", &"[REDACTED]")
            .field("refresh_secret", &"[REDACTED]")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("issuer", &self.issuer)
            .finish()
    }
}

impl AuthConfig {
    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.access_ttl_secs)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    /// How often idle client keys are evicted.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Key clients by `X-Forwarded-For` / `X-Real-IP`. Only enable behind a
    /// proxy that overwrites these headers; otherwise the socket peer is used.
    #[serde(default)]
    pub trust_forwarded_headers: bool,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_secret: String::new(),
            refresh_secret: String::new(),
            access_ttl_secs: default_access_ttl_secs(),
            refresh_ttl_secs: default_refresh_ttl_secs(),
            issuer: default_issuer(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            max_requests: default_max_requests(),
            sweep_interval_secs: default_sweep_interval_secs(),
            trust_forwarded_headers: false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            base_url: default_base_url(),
            auth: AuthConfig::default(),
            rate_limit: RateLimitConfig::default(),
            admins: Vec::new(),
        }
    }
}

fn default_access_ttl_secs() -> u64 { 15 * 60 }
fn default_refresh_ttl_secs() -> u64 { 7 * 24 * 3600 }
fn default_issuer() -> String { "share-a-ride".to_string() }
fn default_base_url() -> String { "http://localhost:8080".to_string() }
fn default_window_secs() -> u64 { 60 }
fn default_max_requests() -> u32 { 100 }
fn default_sweep_interval_secs() -> u64 { 300 }

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// Longest accepted token lifetime (ten years).
pub const MAX_TOKEN_TTL_SECS: u64 = 10 * 365 * 24 * 3600;

const WEAK_SECRETS: &[&str] = &[
    "your-secret-key",
    "your-refresh-secret-key",
    "your-256-bit-secret",
    "secret",
    "password",
    "change-me",
];

impl ServerConfig {
    /// Reads `RIDE_WEB_CONFIG` (TOML) if set, applies `RIDE_*` environment
    /// overrides, then validates.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = std::env::var("RIDE_WEB_CONFIG").map(PathBuf::from).ok();

        let mut config = if let Some(path) = config_path {
            let contents = std::fs::read_to_string(&path)?;
            Self::from_toml(&contents)?
        } else {
            ServerConfig::default()
        };

        config.apply_env()?;
        config.fill_missing_secrets();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    fn apply_env(&mut self) -> anyhow::Result<()> {
        if let Ok(addr) = std::env::var("RIDE_BIND_ADDR") {
            self.bind_addr = addr.parse()?;
        }
        if let Ok(url) = std::env::var("RIDE_BASE_URL") {
            self.base_url = url;
        }
        if let Ok(secret) = std::env::var("RIDE_ACCESS_SECRET") {
            self.auth.access_secret = secret;
        }
        if let Ok(secret) = std::env::var("RIDE_REFRESH_SECRET") {
            self.auth.refresh_secret = secret;
        }
        if let Ok(val) = std::env::var("RIDE_ACCESS_TTL_SECS") {
            self.auth.access_ttl_secs = val.parse()?;
        }
        if let Ok(val) = std::env::var("RIDE_REFRESH_TTL_SECS") {
            self.auth.refresh_ttl_secs = val.parse()?;
        }
        if let Ok(val) = std::env::var("RIDE_RATE_LIMIT_WINDOW_SECS") {
            self.rate_limit.window_secs = val.parse()?;
        }
        if let Ok(val) = std::env::var("RIDE_RATE_LIMIT_MAX_REQUESTS") {
            self.rate_limit.max_requests = val.parse()?;
        }
        if let Ok(val) = std::env::var("RIDE_RATE_LIMIT_TRUST_FORWARDED") {
            self.rate_limit.trust_forwarded_headers = val.parse()?;
        }
        Ok(())
    }

    fn fill_missing_secrets(&mut self) {
        if self.auth.access_secret.is_empty() {
            self.auth.access_secret = random_secret();
            tracing::warn!(
                "No access-token secret configured. Generated random secret (will change on restart)."
            );
        }
        if self.auth.refresh_secret.is_empty() {
            self.auth.refresh_secret = random_secret();
            tracing::warn!(
                "No refresh-token secret configured. Generated random secret (will change on restart)."
            );
        }
    }

    /// Rejects configurations that would weaken token separation or disable
    /// rate limiting.
    pub fn validate(&self) -> anyhow::Result<()> {
        let auth = &self.auth;
        for (name, secret) in [
            ("access", &auth.access_secret),
            ("refresh", &auth.refresh_secret),
        ] {
            if secret.is_empty() {
                anyhow::bail!("{name}-token secret is empty");
            }
            if WEAK_SECRETS.contains(&secret.as_str()) {
                anyhow::bail!(
                    "{name}-token secret matches a known weak/placeholder value. \
                     Set a strong random secret via RIDE_{}_SECRET.",
                    name.to_uppercase()
                );
            }
            if secret.len() < 32 {
                tracing::warn!("{name}-token secret is shorter than 32 characters");
            }
        }
        if auth.access_secret == auth.refresh_secret {
            anyhow::bail!("access and refresh tokens must be signed with different secrets");
        }
        if auth.access_ttl_secs == 0 || auth.refresh_ttl_secs == 0 {
            anyhow::bail!("token TTLs must be greater than zero");
        }
        if auth.access_ttl_secs > MAX_TOKEN_TTL_SECS || auth.refresh_ttl_secs > MAX_TOKEN_TTL_SECS {
            anyhow::bail!("token TTLs must not exceed {MAX_TOKEN_TTL_SECS} seconds");
        }
        if auth.access_ttl_secs >= auth.refresh_ttl_secs {
            anyhow::bail!("access-token TTL must be shorter than refresh-token TTL");
        }
        if self.rate_limit.window_secs == 0 || self.rate_limit.max_requests == 0 {
            anyhow::bail!("rate-limit window and request ceiling must be greater than zero");
        }
        if self.rate_limit.sweep_interval_secs == 0 {
            anyhow::bail!("rate-limit sweep interval must be greater than zero");
        }
        Ok(())
    }
}

fn random_secret() -> String {
    format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple())
}
