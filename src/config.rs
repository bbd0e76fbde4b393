// src/config.rs
use std::{env, fmt::Display, net::IpAddr, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    /// `None` runs on the in-memory backend.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub session_ttl: Duration,
    pub session_sweep: Duration,
    pub cookie_secure: bool,
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        Ok(Self {
            host: try_load("HOST", "0.0.0.0")?,
            port: try_load("PORT", "3030")?,
            database_url: var("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            max_connections: try_load("DATABASE_MAX_CONNECTIONS", "5")?,
            session_ttl: Duration::from_secs(try_load("SESSION_TTL_SECS", "3600")?),
            session_sweep: Duration::from_secs(try_load("SESSION_SWEEP_SECS", "60")?),
            cookie_secure: try_load("COOKIE_SECURE", "false")?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: 3030,
            database_url: None,
            max_connections: 5,
            session_ttl: Duration::from_secs(3600),
            session_sweep: Duration::from_secs(60),
            cookie_secure: false,
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, AppError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
            AppError::Config(format!("{key}: {e}"))
        })
}
