//! `PostgreSQL` store for the transfer booking engine.
//!
//! [`PostgresStore`] implements every store trait from
//! `transfer_core::environment` over one connection pool:
//!
//! - `BookingStore`: payment transitions as guarded single-statement updates
//! - `FleetStore`: active drivers and available vehicles
//! - `AssignmentStore`: assignments guarded by partial unique indexes,
//!   status changes as compare-and-set inside a transaction
//! - `PricingStore`: catalog, hotel zones and the active discount
//!
//! Queries are built at runtime, so the crate compiles without a database.
//!
//! # Example
//!
//! ```no_run
//! use transfer_postgres::PostgresStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PostgresStore::connect("postgres://localhost/transfers").await?;
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod assignments;
mod bookings;
mod fleet;
mod pricing;
mod rows;

use sqlx::PgPool;
use transfer_core::error::StoreError;

/// `PostgreSQL`-backed implementation of every store trait.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wraps an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects with default pool settings.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the connection fails.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to connect: {e}")))?;
        Ok(Self::from_pool(pool))
    }

    /// Runs the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    /// The underlying pool
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}
