//! Request pipeline composition.
//!
//! Every governed request passes through, in order: the rate governor, the
//! authentication gate (protected routes only), then each authorization
//! guard. The first stage that refuses answers the request; later stages
//! and the handler never run.

use std::fmt;
use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::Router;

use crate::auth::gate::{self, AuthGate};
use crate::auth::guard::{self, Guard};
use crate::middleware::rate_limit::{self, RateGovernor};

/// Pipeline stage that produced a rejection. Used as a log field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    RateLimit,
    Authentication,
    Authorization,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimit => "rate_limit",
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builder for the authenticated part of the pipeline.
///
/// ```ignore
/// let drivers = Pipeline::authenticated(gate)
///     .require(Guard::category(AccountCategory::Driver))
///     .apply(driver_routes);
/// ```
#[derive(Clone)]
pub struct Pipeline {
    gate: AuthGate,
    guards: Vec<Guard>,
}

impl Pipeline {
    pub fn authenticated(gate: AuthGate) -> Self {
        Self {
            gate,
            guards: Vec::new(),
        }
    }

    /// Appends a guard. Guards run in the order they were added.
    pub fn require(mut self, guard: Guard) -> Self {
        self.guards.push(guard);
        self
    }

    /// Wraps the router's routes with the gate and guards.
    ///
    /// Uses `route_layer`, so unmatched paths still fall through to a 404
    /// instead of a 401.
    pub fn apply<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        // The last layer added runs first: guards innermost, gate outside them.
        let mut router = router;
        for guard in self.guards.into_iter().rev() {
            router = router.route_layer(from_fn_with_state(guard, guard::enforce));
        }
        router.route_layer(from_fn_with_state(self.gate, gate::require_auth))
    }
}

/// Puts the rate governor in front of every route in `router`.
pub fn governed<S>(router: Router<S>, governor: Arc<RateGovernor>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(from_fn_with_state(governor, rate_limit::rate_limit))
}
