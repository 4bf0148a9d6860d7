//! `PostgreSQL` repositories for the RentCar back-end.
//!
//! [`PgDatabase`] implements every repository trait from
//! `rentcar-core` over one connection pool. Queries are checked at run time
//! (`query_as` with `FromRow` rows), so building the crate does not need a
//! live database.
//!
//! Uniqueness is enforced by named constraints in the schema; violations
//! surface as [`RepositoryError::Conflict`](rentcar_core::repository::RepositoryError)
//! carrying the same messages the in-memory backend reports.
//!
//! # Example
//!
//! ```no_run
//! use rentcar_postgres::{PgDatabase, PoolConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = PgDatabase::connect("postgres://localhost/rentcar", &PoolConfig::default()).await?;
//! db.migrate().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cars;
mod categories;
mod drivers;
mod error;
mod maintenances;
mod transactions;
mod users;

use async_trait::async_trait;
use rentcar_core::pagination::PageRequest;
use rentcar_core::repository::{DatabaseHealth, RepositoryError, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Connection pool settings.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Upper bound on open connections.
    pub max_connections: u32,
    /// Connections kept open when idle.
    pub min_connections: u32,
    /// How long to wait for a free connection.
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// Every repository over a `PostgreSQL` pool.
///
/// Cloning shares the pool.
#[derive(Clone, Debug)]
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    /// Connect a new pool.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Database`] if no connection can be made.
    pub async fn connect(url: &str, config: &PoolConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(url)
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to connect: {e}")))?;

        tracing::info!(
            max_connections = config.max_connections,
            "Connected to PostgreSQL"
        );
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Database`] if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(format!("Migration failed: {e}")))?;
        tracing::info!("Database migrations applied");
        Ok(())
    }
}

#[async_trait]
impl DatabaseHealth for PgDatabase {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(error::query_error)?;
        Ok(())
    }
}

/// `LIMIT` and `OFFSET` bind values for a page.
#[allow(clippy::cast_possible_wrap)] // Both are bounded by u32 arithmetic
const fn limit_offset(page: PageRequest) -> (i64, i64) {
    (page.limit() as i64, page.offset() as i64)
}

/// Row count from `COUNT(*)`.
#[allow(clippy::cast_sign_loss)] // COUNT(*) is never negative
const fn total(count: i64) -> u64 {
    count as u64
}
