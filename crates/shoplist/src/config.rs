use std::{env, path::PathBuf, time::Duration};

use rand::{distr::Alphanumeric, Rng};
use secrecy::SecretString;
use shoplist_auth::TokenConfig;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} has an invalid value {value:?}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("{var} is required when {because} is set")]
    Missing {
        var: &'static str,
        because: &'static str,
    },
}

/// SMTP relay credentials. Email is only sent over SMTP when these are set.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cache TTL in seconds (default: 120)
    pub cache_ttl_seconds: u64,
    /// Maximum number of cache entries (default: 10,000)
    pub cache_max_entries: usize,
    /// Path to SQLite database file (default: "shoplist.db")
    /// Note: Only used when the `sqlite` feature is enabled.
    #[allow(dead_code)]
    pub sqlite_path: String,
    /// Redis connection URL (default: "redis://localhost:6379")
    /// Note: Only used when the `redis` feature is enabled.
    #[allow(dead_code)]
    pub redis_url: String,
    pub token: TokenConfig,
    /// Directory holding uploaded avatars (default: "blobs")
    pub blob_dir: PathBuf,
    /// Public URL prefix for signed blob links
    pub blob_base_url: Url,
    pub blob_url_ttl_seconds: u64,
    pub blob_signing_secret: SecretString,
    pub smtp: Option<SmtpConfig>,
    pub email_from: String,
    /// Capacity of the outbound email queue (default: 100)
    pub queue_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CACHE_TTL_SECONDS` - Cache TTL in seconds (default: 120)
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: 10,000)
    /// - `SQLITE_PATH` - SQLite database path (default: "shoplist.db")
    /// - `REDIS_URL` - Redis connection URL (default: "redis://localhost:6379")
    /// - `JWT_SECRET`, `JWT_ISSUER`, `JWT_AUDIENCE`, `JWT_EXPIRATION_MINUTES` - token settings
    /// - `BLOB_DIR` - avatar directory (default: "blobs")
    /// - `BLOB_BASE_URL` - signed link prefix (default: "http://localhost:3000/blobs/")
    /// - `BLOB_URL_TTL_SECONDS` - signed link lifetime (default: 120)
    /// - `BLOB_SIGNING_SECRET` - HMAC key for signed links (random when unset)
    /// - `SMTP_HOST`, `SMTP_PORT` (587), `SMTP_USERNAME`, `SMTP_PASSWORD` - SMTP relay
    /// - `EMAIL_FROM` - sender address (default: "noreply@shoplist.local")
    /// - `QUEUE_CAPACITY` - email queue size (default: 100)
    pub fn from_env() -> Result<Self, ConfigError> {
        let blob_base_url = parse_base_url(
            &env::var("BLOB_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000/blobs/".to_string()),
        )?;

        let blob_signing_secret = match env::var("BLOB_SIGNING_SECRET") {
            Ok(secret) if !secret.is_empty() => SecretString::from(secret),
            _ => {
                tracing::warn!(
                    "BLOB_SIGNING_SECRET is not set, signed blob links will not survive a restart"
                );
                random_secret()
            }
        };

        Ok(Self {
            cache_ttl_seconds: parse_or("CACHE_TTL_SECONDS", 120),
            cache_max_entries: parse_or("CACHE_MAX_ENTRIES", 10_000),
            sqlite_path: env::var("SQLITE_PATH").unwrap_or_else(|_| "shoplist.db".to_string()),
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            token: TokenConfig::from_env(),
            blob_dir: PathBuf::from(env::var("BLOB_DIR").unwrap_or_else(|_| "blobs".to_string())),
            blob_base_url,
            blob_url_ttl_seconds: parse_or("BLOB_URL_TTL_SECONDS", 120),
            blob_signing_secret,
            smtp: smtp_from_env()?,
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "noreply@shoplist.local".to_string()),
            queue_capacity: parse_or("QUEUE_CAPACITY", 100),
        })
    }

    /// Get cache TTL as a Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn blob_url_ttl(&self) -> Duration {
        Duration::from_secs(self.blob_url_ttl_seconds)
    }
}

fn parse_or<T: std::str::FromStr>(var: &str, default: T) -> T {
    env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses a URL prefix, making sure it ends with `/` so blob names join under it.
pub fn parse_base_url(value: &str) -> Result<Url, ConfigError> {
    let normalized = if value.ends_with('/') {
        value.to_string()
    } else {
        format!("{value}/")
    };
    Url::parse(&normalized).map_err(|e| ConfigError::InvalidValue {
        var: "BLOB_BASE_URL",
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn smtp_from_env() -> Result<Option<SmtpConfig>, ConfigError> {
    let Ok(host) = env::var("SMTP_HOST") else {
        return Ok(None);
    };

    let port = match env::var("SMTP_PORT") {
        Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            var: "SMTP_PORT",
            value,
            reason: "expected a port number".to_string(),
        })?,
        Err(_) => 587,
    };
    let username = env::var("SMTP_USERNAME").map_err(|_| ConfigError::Missing {
        var: "SMTP_USERNAME",
        because: "SMTP_HOST",
    })?;
    let password = env::var("SMTP_PASSWORD").map_err(|_| ConfigError::Missing {
        var: "SMTP_PASSWORD",
        because: "SMTP_HOST",
    })?;

    Ok(Some(SmtpConfig {
        host,
        port,
        username,
        password: SecretString::from(password),
    }))
}

fn random_secret() -> SecretString {
    let secret: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    SecretString::from(secret)
}

#[cfg(test)]
impl Default for Config {
    /// Test configuration: no environment lookups and a per-instance blob directory.
    fn default() -> Self {
        Self {
            cache_ttl_seconds: 120,
            cache_max_entries: 1_000,
            sqlite_path: ":memory:".to_string(),
            redis_url: "redis://localhost:6379".to_string(),
            token: TokenConfig::ephemeral(),
            blob_dir: env::temp_dir().join(format!("shoplist-test-{}", uuid::Uuid::new_v4())),
            blob_base_url: Url::parse("http://localhost:3000/blobs/").expect("static URL"),
            blob_url_ttl_seconds: 120,
            blob_signing_secret: random_secret(),
            smtp: None,
            email_from: "noreply@shoplist.local".to_string(),
            queue_capacity: 16,
        }
    }
}
