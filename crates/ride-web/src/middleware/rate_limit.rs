//! Per-client sliding-window rate limiting.
//!
//! Each client key owns a queue of admission instants. A check prunes the
//! instants that have left the trailing window, compares the remainder with
//! the limit and, when admitted, records `now`. That sequence runs under the
//! key's shard guard in a [`DashMap`], so concurrent checks for one key are
//! serialised while unrelated keys proceed in parallel.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::error::AuthError;
use crate::pipeline::Stage;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";
const UNKNOWN_CLIENT: &str = "unknown";

/// Monotonic time source.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset_nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset_nanos: AtomicU64::new(0),
        }
    }

    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.offset_nanos.fetch_add(nanos, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + Duration::from_nanos(self.offset_nanos.load(Ordering::SeqCst))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed { remaining: u32 },
    Rejected { retry_after: Duration },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

pub struct RateGovernor {
    window: Duration,
    limit: u32,
    clock: Arc<dyn Clock>,
    trust_forwarded_headers: bool,
    windows: DashMap<String, VecDeque<Instant>>,
}

impl RateGovernor {
    pub fn new(window: Duration, limit: u32) -> Self {
        Self::with_clock(window, limit, Arc::new(SystemClock))
    }

    pub fn with_clock(window: Duration, limit: u32, clock: Arc<dyn Clock>) -> Self {
        Self {
            window,
            limit,
            clock,
            trust_forwarded_headers: false,
            windows: DashMap::new(),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.window(), config.max_requests)
            .trusting_forwarded_headers(config.trust_forwarded_headers)
    }

    /// Whether [`client_key`] may read proxy headers for this governor.
    pub fn trusting_forwarded_headers(mut self, trust: bool) -> Self {
        self.trust_forwarded_headers = trust;
        self
    }

    pub fn trusts_forwarded_headers(&self) -> bool {
        self.trust_forwarded_headers
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Admits or rejects one request for `key`.
    ///
    /// An instant `t` is inside the window while `now - t < window`. A
    /// rejected call records nothing.
    pub fn admit(&self, key: &str) -> Admission {
        self.admit_traced(key).0
    }

    /// [`admit`](Self::admit), also returning the instant the decision was
    /// taken at.
    fn admit_traced(&self, key: &str) -> (Admission, Instant) {
        let mut entry = self.windows.entry(key.to_owned()).or_default();
        let now = self.clock.now();

        // Instants are appended in clock order, so expired ones sit at the front.
        while let Some(&oldest) = entry.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                entry.pop_front();
            } else {
                break;
            }
        }

        let count = entry.len();
        if count >= self.limit as usize {
            let retry_after = match entry.front() {
                Some(&oldest) => (oldest + self.window).saturating_duration_since(now),
                None => self.window,
            };
            return (Admission::Rejected { retry_after }, now);
        }

        entry.push_back(now);
        let remaining = self.limit.saturating_sub(u32::try_from(count + 1).unwrap_or(u32::MAX));
        (Admission::Allowed { remaining }, now)
    }

    /// Drops keys whose most recent admission has left the window.
    ///
    /// Keys with any in-window instant are left untouched, so a sweep never
    /// changes a later admission decision. Returns the number of keys removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let before = self.windows.len();
        self.windows.retain(|_, instants| {
            instants
                .back()
                .is_some_and(|&last| now.saturating_duration_since(last) < self.window)
        });
        before.saturating_sub(self.windows.len())
    }

    /// Number of client keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}

impl std::fmt::Debug for RateGovernor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateGovernor")
            .field("window", &self.window)
            .field("limit", &self.limit)
            .field("trust_forwarded_headers", &self.trust_forwarded_headers)
            .field("tracked_keys", &self.windows.len())
            .finish()
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Identifies the caller by socket peer address.
///
/// With `trust_forwarded_headers` the first `X-Forwarded-For` hop, then
/// `X-Real-IP`, take precedence. Those headers are client-controlled unless a
/// proxy rewrites them, so they are ignored by default.
pub fn client_key(req: &Request, trust_forwarded_headers: bool) -> String {
    if trust_forwarded_headers {
        let headers = req.headers();
        if let Some(first) = header_str(headers, X_FORWARDED_FOR)
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            return first.to_string();
        }
        if let Some(real_ip) = header_str(headers, X_REAL_IP) {
            return real_ip.to_string();
        }
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Middleware: the first pipeline stage.
pub async fn rate_limit(
    State(governor): State<Arc<RateGovernor>>,
    req: Request,
    next: Next,
) -> Response {
    let key = client_key(&req, governor.trusts_forwarded_headers());
    match governor.admit(&key) {
        Admission::Allowed { remaining } => {
            let mut response = next.run(req).await;
            let headers = response.headers_mut();
            headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(governor.limit()));
            headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(remaining));
            response
        }
        Admission::Rejected { retry_after } => {
            tracing::warn!(
                stage = %Stage::RateLimit,
                client = %key,
                retry_after_ms = retry_after.as_millis() as u64,
                path = %req.uri().path(),
                "request rejected"
            );
            AuthError::RateLimited { retry_after }.into_response()
        }
    }
}
