use std::sync::Arc;

use ride_core::{
    AccountCategory, AccountService, CoreError, DriverService, InMemoryDriverRepository, InMemoryUserRepository,
    LogNotifier, Notifier, User, UserRepository,
};

use crate::auth::{AuthGate, PrincipalLookup, TokenService, UserLookup};
use crate::config::ServerConfig;
use crate::middleware::rate_limit::RateGovernor;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub tokens: TokenService,
    pub governor: Arc<RateGovernor>,
    pub users: Arc<dyn UserRepository>,
    pub lookup: Arc<dyn PrincipalLookup>,
    pub accounts: AccountService,
    pub drivers: DriverService,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// State backed by the in-memory repositories and the log notifier.
    pub fn new(config: ServerConfig) -> Self {
        let users: Arc<dyn UserRepository> = Arc::new(InMemoryUserRepository::new());
        let drivers = DriverService::new(Arc::new(InMemoryDriverRepository::new()));
        Self {
            tokens: TokenService::new(&config.auth),
            governor: Arc::new(RateGovernor::from_config(&config.rate_limit)),
            lookup: Arc::new(UserLookup::new(users.clone())),
            accounts: AccountService::new(users.clone()),
            users,
            drivers,
            notifier: Arc::new(LogNotifier::new(config.base_url.clone())),
            config: Arc::new(config),
        }
    }

    /// Replaces the rate governor, e.g. with one driven by a manual clock.
    pub fn with_governor(mut self, governor: Arc<RateGovernor>) -> Self {
        self.governor = governor;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn gate(&self) -> AuthGate {
        AuthGate::new(self.tokens.clone(), self.lookup.clone())
    }

    /// Creates the configured admin accounts, already email-verified.
    /// Existing emails are skipped.
    pub async fn seed_admins(&self) -> anyhow::Result<usize> {
        let mut created = 0;
        for seed in &self.config.admins {
            let mut user = User::new(
                seed.name.as_str(),
                &seed.email,
                seed.phone.as_str(),
                seed.password_hash.as_str(),
                AccountCategory::Admin,
            )
            .map_err(|e| anyhow::anyhow!("invalid admin seed {}: {e}", seed.email))?;
            user.mark_email_verified();

            let email = user.email.clone();
            match self.users.create(user).await {
                Ok(()) => {
                    tracing::info!(%email, "seeded admin account");
                    created += 1;
                }
                Err(CoreError::EmailTaken | CoreError::PhoneTaken) => {
                    tracing::warn!(email = %seed.email, "admin seed already exists, skipping");
                }
                Err(e) => return Err(anyhow::anyhow!("failed to seed admin {}: {e}", seed.email)),
            }
        }
        Ok(created)
    }
}
