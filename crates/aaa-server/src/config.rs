//! Server configuration
//!
//! Read from `AAA_*` environment variables at start. Any invalid or missing
//! required value is a `FatalConfig` error and the server must not start.

use aaa_core::{AaaError, Result};
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// Default listen port
pub const DEFAULT_PORT: u16 = 8443;

/// Default access token lifetime
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(300);

/// Longest allowed access token lifetime
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Default PostgreSQL pool size
pub const DEFAULT_POOL_SIZE: u32 = 10;

/// Default catalogue cache TTL
pub const DEFAULT_CATALOGUE_CACHE_TTL: Duration = Duration::from_secs(300);

/// Where resource descriptors come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogueSource {
    /// A JSON array of descriptors on disk
    File(PathBuf),
    /// A remote catalogue service
    Url(String),
}

/// Complete server configuration
#[derive(Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub issuer_domain: String,
    pub token_lifetime: Duration,
    pub keystore_path: PathBuf,
    pub keystore_password: String,
    pub database_url: Option<String>,
    pub pool_size: u32,
    pub catalogue: CatalogueSource,
    pub catalogue_cache_ttl: Duration,
    /// Most verbose level the subscriber records
    pub log_level: Level,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("port", &self.port)
            .field("issuer_domain", &self.issuer_domain)
            .field("token_lifetime", &self.token_lifetime)
            .field("keystore_path", &self.keystore_path)
            .field("keystore_password", &"[redacted]")
            .field("database_url", &self.database_url.as_ref().map(|_| "[redacted]"))
            .field("pool_size", &self.pool_size)
            .field("catalogue", &self.catalogue)
            .field("catalogue_cache_ttl", &self.catalogue_cache_ttl)
            .field("log_level", &self.log_level)
            .finish()
    }
}

fn fatal(msg: impl Into<String>) -> AaaError {
    AaaError::FatalConfig(msg.into())
}

fn parse_var<T: std::str::FromStr>(name: &str, value: Option<String>, default: T) -> Result<T> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| fatal(format!("{} has an invalid value: '{}'", name, raw))),
    }
}

fn required(name: &str, value: Option<String>) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| fatal(format!("{} must be set", name)))
}

/// Check a token lifetime is positive and at most `MAX_TOKEN_LIFETIME`
pub fn validate_token_lifetime(lifetime: Duration) -> Result<()> {
    if lifetime.is_zero() {
        return Err(fatal("token lifetime must be positive"));
    }
    if lifetime > MAX_TOKEN_LIFETIME {
        return Err(fatal(format!(
            "token lifetime {}s exceeds the maximum of {}s",
            lifetime.as_secs(),
            MAX_TOKEN_LIFETIME.as_secs()
        )));
    }
    Ok(())
}

impl ServerConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Read configuration through `var`, which returns a variable's value
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let issuer_domain = required("AAA_ISSUER_DOMAIN", var("AAA_ISSUER_DOMAIN"))?;
        let keystore_path = PathBuf::from(required("AAA_KEYSTORE_PATH", var("AAA_KEYSTORE_PATH"))?);
        let keystore_password = required("AAA_KEYSTORE_PASSWORD", var("AAA_KEYSTORE_PASSWORD"))?;

        let port = parse_var("AAA_PORT", var("AAA_PORT"), DEFAULT_PORT)?;

        let lifetime_secs = parse_var(
            "AAA_TOKEN_LIFETIME_SECS",
            var("AAA_TOKEN_LIFETIME_SECS"),
            DEFAULT_TOKEN_LIFETIME.as_secs(),
        )?;
        let token_lifetime = Duration::from_secs(lifetime_secs);
        validate_token_lifetime(token_lifetime)?;

        let pool_size = parse_var("AAA_POOL_SIZE", var("AAA_POOL_SIZE"), DEFAULT_POOL_SIZE)?;
        if pool_size == 0 {
            return Err(fatal("AAA_POOL_SIZE must be at least 1"));
        }

        let catalogue = match (
            var("AAA_CATALOGUE_URL").filter(|v| !v.trim().is_empty()),
            var("AAA_CATALOGUE_FILE").filter(|v| !v.trim().is_empty()),
        ) {
            (Some(url), None) => CatalogueSource::Url(url),
            (None, Some(file)) => CatalogueSource::File(PathBuf::from(file)),
            (Some(_), Some(_)) => {
                return Err(fatal("set only one of AAA_CATALOGUE_URL and AAA_CATALOGUE_FILE"))
            }
            (None, None) => {
                return Err(fatal("one of AAA_CATALOGUE_URL or AAA_CATALOGUE_FILE must be set"))
            }
        };

        let ttl_secs = parse_var(
            "AAA_CATALOGUE_CACHE_TTL_SECS",
            var("AAA_CATALOGUE_CACHE_TTL_SECS"),
            DEFAULT_CATALOGUE_CACHE_TTL.as_secs(),
        )?;

        let log_level = parse_var("AAA_LOG_LEVEL", var("AAA_LOG_LEVEL"), Level::INFO)?;

        Ok(Self {
            port,
            issuer_domain,
            token_lifetime,
            keystore_path,
            keystore_password,
            database_url: var("AAA_DATABASE_URL").filter(|v| !v.trim().is_empty()),
            pool_size,
            catalogue,
            catalogue_cache_ttl: Duration::from_secs(ttl_secs),
            log_level,
        })
    }
}
