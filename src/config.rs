use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum StorageBackend {
    Mysql,
    Memory,
}

#[derive(Clone)]
pub struct Config {
    pub server_addr: String,
    pub storage_backend: StorageBackend,
    /// Required when `storage_backend` is MySQL.
    pub database_url: Option<String>,
    pub run_migrations: bool,
    pub jwt_secret: String,

    pub rate_protected_per_min: u32,
    pub audit_queue_capacity: usize,

    pub api_prefix: String,
    pub log_dir: String,
}

fn parse_or<T: FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let storage_backend = parse_or("STORAGE_BACKEND", StorageBackend::Mysql)?;
        let database_url = env::var("DATABASE_URL").ok();
        if storage_backend == StorageBackend::Mysql && database_url.is_none() {
            anyhow::bail!("DATABASE_URL must be set when STORAGE_BACKEND is mysql");
        }

        Ok(Self {
            server_addr: env::var("SERVER_ADDR").context("SERVER_ADDR must be set")?,
            storage_backend,
            database_url,
            run_migrations: parse_or("RUN_MIGRATIONS", true)?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,

            rate_protected_per_min: parse_or("RATE_PROTECTED_PER_MIN", 1000)?,
            audit_queue_capacity: parse_or("AUDIT_QUEUE_CAPACITY", 1024)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
        })
    }
}
