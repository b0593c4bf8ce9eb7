//! Database access: pool lifecycle and the payment record store.

pub mod error;
pub mod memory;
pub mod payment_records;
pub mod store;

pub use error::DatabaseError;
pub use memory::InMemoryPaymentStore;
pub use payment_records::PgPaymentStore;
pub use store::PaymentStore;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;

/// Connection pool tuning. Built once at startup; the pool is the only
/// shared resource in the service.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 20,
            min_connections: 2,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

/// Builds the Postgres pool and verifies connectivity with one round trip.
pub async fn init_pool(
    database_url: &str,
    config: Option<PoolConfig>,
) -> Result<PgPool, DatabaseError> {
    let config = config.unwrap_or_default();

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .max_lifetime(config.max_lifetime)
        .connect(database_url)
        .await
        .map_err(|e| DatabaseError::Connection {
            message: e.to_string(),
        })?;

    sqlx::query("SELECT 1")
        .fetch_one(&pool)
        .await
        .map_err(|e| DatabaseError::Connection {
            message: format!("connectivity check failed: {e}"),
        })?;

    info!(
        max_connections = config.max_connections,
        "Database pool initialized"
    );
    Ok(pool)
}

pub async fn init_pool_from_config(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
    let pool_config = PoolConfig {
        max_connections: config.max_connections,
        min_connections: config.min_connections,
        acquire_timeout: Duration::from_secs(config.connect_timeout_secs),
        ..PoolConfig::default()
    };
    init_pool(&config.url, Some(pool_config)).await
}

/// One-shot connectivity probe used by the health endpoint.
pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .map(|_| ())
        .map_err(|e| DatabaseError::Connection {
            message: e.to_string(),
        })
}
