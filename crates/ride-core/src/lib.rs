//! Share-a-ride core library: transport-agnostic domain logic.
//!
//! `ride-core` holds the entities and capabilities the HTTP service is built
//! on. Nothing here knows about requests, tokens or rate limits.
//!
//! # Modules
//!
//! - [`model`]: [`User`], [`AccountCategory`], [`Driver`] and onboarding records.
//! - [`repo`]: persistence capabilities and their in-memory implementations.
//! - [`account`]: [`AccountService`] for email verification and password resets.
//! - [`driver`]: [`DriverService`] for onboarding, location and availability.
//! - [`notify`]: the [`Notifier`] capability and [`LogNotifier`].
//! - [`error`]: unified error type ([`CoreError`]) and result alias ([`CoreResult`]).

pub mod account;
pub mod driver;
pub mod error;
pub mod model;
pub mod notify;
pub mod repo;

pub use account::AccountService;
pub use driver::{DocumentInput, DriverService, OnboardInput};
pub use error::{CoreError, CoreResult};
pub use model::driver::{Document, DocumentType, Driver, Location, Vehicle, VehicleType};
pub use model::user::{AccountCategory, User, RESET_TOKEN_TTL_SECS};
pub use notify::{LogNotifier, Notification, Notifier};
pub use repo::{DriverRepository, InMemoryDriverRepository, InMemoryUserRepository, UserRepository};
