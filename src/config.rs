use std::env;
use std::time::Duration;
use anyhow::{Context, Result};

const DEFAULT_STORE_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub environment: String,
    pub cache: CacheConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub ssl_mode: String,
    pub max_connections: usize,
    pub timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, applying the same
    /// defaults as `from_env`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let port = var("PORT", "8000")
            .parse::<u16>()
            .context("PORT must be a valid port number")?;

        let environment = var("ENVIRONMENT", "development");

        let timeout_secs = var("STORE_TIMEOUT_SECS", &DEFAULT_STORE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .context("STORE_TIMEOUT_SECS must be a valid number of seconds")?;
        let timeout = Duration::from_secs(timeout_secs);

        let cache = CacheConfig {
            host: var("REDIS_HOST", "localhost"),
            port: var("REDIS_PORT", "6379")
                .parse::<u16>()
                .context("REDIS_PORT must be a valid port number")?,
            password: Some(var("REDIS_PASSWORD", "redis_password")).filter(|p| !p.is_empty()),
            timeout,
        };

        let database = DatabaseConfig {
            host: var("POSTGRES_HOST", "localhost"),
            port: var("POSTGRES_PORT", "5432")
                .parse::<u16>()
                .context("POSTGRES_PORT must be a valid port number")?,
            database: var("POSTGRES_DB", "interview_db"),
            username: var("POSTGRES_USER", "interview_user"),
            password: var("POSTGRES_PASSWORD", "interview_password"),
            ssl_mode: var("POSTGRES_SSL_MODE", "prefer"),
            max_connections: var("POSTGRES_MAX_CONNECTIONS", "1")
                .parse::<usize>()
                .context("POSTGRES_MAX_CONNECTIONS must be a valid number")?,
            timeout,
        };

        let config = Config {
            port,
            environment,
            cache,
            database,
        };
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("PORT must be greater than 0");
        }

        self.cache.validate()?;
        self.database.validate()?;

        Ok(())
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            anyhow::bail!("Redis host cannot be empty");
        }

        if self.port == 0 {
            anyhow::bail!("Redis port must be greater than 0");
        }

        if self.timeout.is_zero() {
            anyhow::bail!("Store timeout must be greater than 0");
        }

        Ok(())
    }
}

impl DatabaseConfig {
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            anyhow::bail!("Database host cannot be empty");
        }

        if self.port == 0 {
            anyhow::bail!("Database port must be greater than 0");
        }

        if self.database.trim().is_empty() {
            anyhow::bail!("Database name cannot be empty");
        }

        if self.username.trim().is_empty() {
            anyhow::bail!("Database username cannot be empty");
        }

        match self.ssl_mode.as_str() {
            "disable" | "prefer" | "require" => {}
            _ => anyhow::bail!("Invalid SSL mode. Must be one of: disable, prefer, require"),
        }

        if self.max_connections == 0 {
            anyhow::bail!("Max connections must be greater than 0");
        }

        if self.timeout.is_zero() {
            anyhow::bail!("Store timeout must be greater than 0");
        }

        Ok(())
    }
}
