// Connection manager
// Owns the lazily-created handles to the cache and relational stores

use deadpool_postgres::{Object, PoolError};
use redis::aio::MultiplexedConnection;
use redis::RedisError;
use thiserror::Error;

use crate::{cache::Cache, config::Config, db::Database};

/// A store could not be reached or its handle failed validation.
/// Handlers turn this into a 503 instead of propagating the transport error.
#[derive(Error, Debug)]
pub enum Unavailable {
    #[error("Redis not available: {0}")]
    Cache(#[source] RedisError),

    #[error("Database not available: {0}")]
    Database(#[source] PoolError),
}

impl Unavailable {
    /// Client-facing message, without the transport details.
    pub fn detail(&self) -> &'static str {
        match self {
            Unavailable::Cache(_) => "Redis not available",
            Unavailable::Database(_) => "Database not available",
        }
    }
}

/// Process-wide store handles shared by every request through `AppState`.
/// Nothing connects until the first acquire; concurrent requests reuse the
/// same memoized handles, and a reconnect race at worst opens one extra
/// connection.
pub struct Connections {
    pub cache: Cache,
    pub database: Database,
}

impl Connections {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Ok(Connections {
            cache: Cache::new(&config.cache)?,
            database: Database::new(&config.database)?,
        })
    }

    pub async fn acquire_cache(&self) -> Result<MultiplexedConnection, Unavailable> {
        self.cache.acquire().await
    }

    pub async fn acquire_database(&self) -> Result<Object, Unavailable> {
        self.database.acquire().await
    }
}
