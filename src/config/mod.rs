//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast if required vars are missing or any
//! poller setting is malformed. The database URL is wrapped in
//! secrecy::SecretString to prevent log leaks.

pub mod secrets;

use crate::db::CollectionName;
use crate::engine::PollConfig;
use crate::error::{Error, Result};
use crate::model::Status;
use secrecy::SecretString;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug)]
pub struct Config {
    pub database_url: SecretString,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
    pub poll: PollConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: SecretString::from(required_var("DATABASE_URL")?),
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            poll: poll_from_env()?,
        })
    }
}

/// Poller settings from `CLAIMQ_*` variables, defaulting anything unset.
pub fn poll_from_env() -> Result<PollConfig> {
    let defaults = PollConfig::default();

    let collection = match std::env::var("CLAIMQ_COLLECTION") {
        Ok(name) => CollectionName::new(name)?,
        Err(_) => defaults.collection,
    };
    let ready_status = optional_var("CLAIMQ_READY_STATUS")
        .map(Status::new)
        .unwrap_or(defaults.ready_status);
    let owned_status = optional_var("CLAIMQ_OWNED_STATUS")
        .map(Status::new)
        .unwrap_or(defaults.owned_status);

    let config = PollConfig {
        collection,
        ready_status,
        owned_status,
        poll_interval: parsed_var::<u64>("CLAIMQ_POLL_INTERVAL_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.poll_interval),
        max_batch: parsed_var("CLAIMQ_MAX_BATCH")?.unwrap_or(defaults.max_batch),
        operation_timeout: parsed_var::<u64>("CLAIMQ_OP_TIMEOUT_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.operation_timeout),
        transactional: parsed_var("CLAIMQ_TRANSACTIONAL")?.unwrap_or(defaults.transactional),
    };
    config.validate()?;
    Ok(config)
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| Error::Config(format!("required environment variable {name} is not set")))
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    optional_var(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| Error::Config(format!("{name}={raw:?} is invalid: {e}")))
        })
        .transpose()
}
