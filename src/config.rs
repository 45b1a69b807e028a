//! Server configuration loaded from the environment.
//!
//! # Environment Variables
//!
//! - `HOST`: bind address (default: `0.0.0.0`)
//! - `PORT`: HTTP port (default: 3000)
//! - `DATABASE_PATH`: SQLite file, or `:memory:` (default: `data/melon.db`)
//! - `FILES_DIR`: upload directory (default: `files`)
//! - `SESSION_TTL_HOURS`: login session lifetime (default: 24)
//! - `MAX_BODY_BYTES`: request body limit (default: 100 MiB)
//!
//! A `.env` file in the working directory is read first when present.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;

/// Runtime configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub files_dir: PathBuf,
    pub session_ttl_hours: i64,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_path: "data/melon.db".to_string(),
            files_dir: PathBuf::from("files"),
            session_ttl_hours: 24,
            max_body_bytes: 100 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Build a config from process environment (after loading `.env`).
    pub fn from_env() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port)?,
            database_path: lookup("DATABASE_PATH").unwrap_or(defaults.database_path),
            files_dir: lookup("FILES_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.files_dir),
            session_ttl_hours: parse_or(&lookup, "SESSION_TTL_HOURS", defaults.session_ttl_hours)?,
            max_body_bytes: parse_or(&lookup, "MAX_BODY_BYTES", defaults.max_body_bytes)?,
        })
    }

    /// `host:port` string for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}
