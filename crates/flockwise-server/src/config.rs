//! Server configuration loaded from `FLOCKWISE_*` environment variables.

use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use flockwise_db::DbConfig;
use flockwise_service::{OpsConfig, OverMortalityPolicy};

const DEFAULT_LOG_DIRECTIVE: &str = "flockwise=info";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub db: DbConfig,
    pub ops: OpsConfig,
    /// Pepper prepended to passwords before Argon2id hashing.
    pub password_pepper: Option<String>,
    /// `tracing` filter directive.
    pub log_directive: String,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup; unset keys
    /// fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = DbConfig::default();
        let db = DbConfig {
            url: lookup("FLOCKWISE_DB_URL").unwrap_or(defaults.url),
            namespace: lookup("FLOCKWISE_DB_NAMESPACE").unwrap_or(defaults.namespace),
            database: lookup("FLOCKWISE_DB_DATABASE").unwrap_or(defaults.database),
            username: lookup("FLOCKWISE_DB_USERNAME").unwrap_or(defaults.username),
            password: lookup("FLOCKWISE_DB_PASSWORD").unwrap_or(defaults.password),
        };

        let ops_defaults = OpsConfig::default();
        let over_mortality_policy = match lookup("FLOCKWISE_OVER_MORTALITY") {
            Some(raw) => OverMortalityPolicy::parse(&raw)
                .ok_or_else(|| anyhow!("unknown over-mortality policy: {raw}"))
                .context("Failed to parse FLOCKWISE_OVER_MORTALITY")?,
            None => ops_defaults.over_mortality_policy,
        };
        let ops = OpsConfig {
            default_page_size: parse_or(
                &lookup,
                "FLOCKWISE_PAGE_SIZE",
                ops_defaults.default_page_size,
            )?,
            over_mortality_policy,
            discrepancy_tolerance: parse_or(
                &lookup,
                "FLOCKWISE_DISCREPANCY_TOLERANCE",
                ops_defaults.discrepancy_tolerance,
            )?,
        };
        if ops.default_page_size == 0 {
            return Err(anyhow!("FLOCKWISE_PAGE_SIZE must be greater than zero"));
        }

        Ok(Self {
            db,
            ops,
            password_pepper: lookup("FLOCKWISE_PASSWORD_PEPPER").filter(|p| !p.is_empty()),
            log_directive: lookup("FLOCKWISE_LOG").unwrap_or_else(|| DEFAULT_LOG_DIRECTIVE.into()),
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("Failed to parse {key}")),
        None => Ok(default),
    }
}
