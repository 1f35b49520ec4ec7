//! Environment configuration
use anyhow::{Context, Result};
use sqlx::postgres::PgConnectOptions;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct Config {
    /// Connection whose database name is swapped for each tenant's.
    pub database: PgConnectOptions,
    pub tenant_db_prefix: String,
    pub max_connections: u32,
    pub nats_url: Option<String>,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        Ok(Self {
            database: PgConnectOptions::from_str(&url).context("DATABASE_URL is not a valid Postgres URL")?,
            tenant_db_prefix: std::env::var("TENANT_DB_PREFIX").unwrap_or_else(|_| "restaurant_".to_string()),
            max_connections: parse_or("DB_MAX_CONNECTIONS", 10)?,
            nats_url: std::env::var("NATS_URL").ok().filter(|u| !u.is_empty()),
            port: parse_or("PORT", 8083)?,
        })
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> Result<T>
where T::Err: std::error::Error + Send + Sync + 'static {
    match std::env::var(key) {
        Ok(raw) => raw.parse().with_context(|| format!("{} has an invalid value '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}
