//! Application state for the RentCar HTTP server.
//!
//! Contains every shared resource handlers need:
//! - Repositories (`PostgreSQL` in production, in-memory in tests)
//! - Token service, password hasher and token blocklist
//! - Image storage and the clock

use crate::images::ImageStore;
use rentcar_auth::{AuthConfig, PasswordHasher, TokenBlocklist, TokenService};
use rentcar_core::environment::Clock;
use rentcar_core::repository::{
    CarRepository, CategoryRepository, DatabaseHealth, DriverRepository, MaintenanceRepository,
    TransactionRepository, UserRepository,
};
use std::sync::Arc;
use std::time::Duration;

/// How long a rental command may take before the request gives up.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// One handle per repository trait.
#[derive(Clone)]
pub struct Repositories {
    /// Accounts
    pub users: Arc<dyn UserRepository>,
    /// Car categories
    pub categories: Arc<dyn CategoryRepository>,
    /// Fleet
    pub cars: Arc<dyn CarRepository>,
    /// Drivers
    pub drivers: Arc<dyn DriverRepository>,
    /// Maintenance records
    pub maintenances: Arc<dyn MaintenanceRepository>,
    /// Rentals
    pub transactions: Arc<dyn TransactionRepository>,
    /// Database liveness
    pub health: Arc<dyn DatabaseHealth>,
}

impl Repositories {
    /// Use one backend for every repository.
    #[must_use]
    pub fn from_shared<D>(db: Arc<D>) -> Self
    where
        D: UserRepository
            + CategoryRepository
            + CarRepository
            + DriverRepository
            + MaintenanceRepository
            + TransactionRepository
            + DatabaseHealth
            + 'static,
    {
        Self {
            users: db.clone(),
            categories: db.clone(),
            cars: db.clone(),
            drivers: db.clone(),
            maintenances: db.clone(),
            transactions: db.clone(),
            health: db,
        }
    }
}

/// Application state shared across all HTTP handlers.
///
/// Cloned (cheaply via Arc) for each request. Rental commands build a
/// fresh store per request from these dependencies.
#[derive(Clone)]
pub struct AppState {
    /// Accounts
    pub users: Arc<dyn UserRepository>,
    /// Car categories
    pub categories: Arc<dyn CategoryRepository>,
    /// Fleet
    pub cars: Arc<dyn CarRepository>,
    /// Drivers
    pub drivers: Arc<dyn DriverRepository>,
    /// Maintenance records
    pub maintenances: Arc<dyn MaintenanceRepository>,
    /// Rentals
    pub transactions: Arc<dyn TransactionRepository>,
    /// Database liveness
    pub database: Arc<dyn DatabaseHealth>,
    /// Issues and verifies access tokens
    pub tokens: TokenService,
    /// Hashes passwords
    pub hasher: PasswordHasher,
    /// Tokens revoked by logout
    pub blocklist: Arc<dyn TokenBlocklist>,
    /// Uploaded images
    pub images: Arc<dyn ImageStore>,
    /// Time source
    pub clock: Arc<dyn Clock>,
    /// Deadline for rental commands
    pub command_timeout: Duration,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        repos: Repositories,
        auth: &AuthConfig,
        blocklist: Arc<dyn TokenBlocklist>,
        images: Arc<dyn ImageStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users: repos.users,
            categories: repos.categories,
            cars: repos.cars,
            drivers: repos.drivers,
            maintenances: repos.maintenances,
            transactions: repos.transactions,
            database: repos.health,
            tokens: TokenService::new(auth),
            hasher: PasswordHasher::new(auth.hash_iterations),
            blocklist,
            images,
            clock,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Override the rental command deadline.
    #[must_use]
    pub const fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }
}
