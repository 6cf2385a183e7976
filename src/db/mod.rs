//! Persistence for runs and steps: the `RunStore` contract and its backends.

pub mod memory;
pub mod store;
pub mod test_runs;
pub mod test_steps;

use std::future::Future;
use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::migration::Migrator;

pub use memory::MemoryStore;
pub use store::{Planner, RunStore};

/// Deadline for store work done on behalf of one request.
#[derive(Debug, Clone, Copy)]
pub struct StoreTimeout(pub Duration);

impl StoreTimeout {
    /// Await `fut` under the deadline. Expiry is a `TransientStore` error
    /// naming `subject`; the future is dropped, so nothing further is applied.
    pub async fn bound<T, F>(self, subject: &str, fut: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        tokio::time::timeout(self.0, fut).await.map_err(|_| {
            AppError::TransientStore(format!(
                "Store did not finish within {}ms for {}",
                self.0.as_millis(),
                subject
            ))
        })?
    }
}

/// Database connection pool wrapper (PostgreSQL via SeaORM).
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
}

impl DbPool {
    /// Create a new database pool from configuration.
    ///
    /// Connect and acquire waits are bounded by the store timeout so a stalled
    /// database surfaces as a transient failure instead of a hung delivery.
    pub async fn new(config: &Config) -> AppResult<Self> {
        let mut options = ConnectOptions::new(config.database.url.clone());
        options
            .max_connections(config.database.max_connections)
            .min_connections(1)
            .connect_timeout(config.store_timeout)
            .acquire_timeout(config.store_timeout)
            .sqlx_logging(false);

        let conn = Database::connect(options)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to database: {}", e)))?;

        Ok(DbPool { conn })
    }

    /// Get access to the connection for executing queries.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Apply all pending migrations.
    pub async fn run_migrations(&self) -> AppResult<()> {
        Migrator::up(&self.conn, None)
            .await
            .map_err(|e| AppError::Database(format!("Failed to run migrations: {}", e)))
    }

    /// Round-trip a trivial query to confirm the database is reachable.
    pub async fn ping(&self) -> AppResult<()> {
        let stmt = sea_orm::Statement::from_string(
            sea_orm::DatabaseBackend::Postgres,
            "SELECT 1".to_owned(),
        );
        self.conn.query_one_raw(stmt).await?;
        Ok(())
    }
}
