use std::path::PathBuf;

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Resolve the store file location from the environment.
///
/// Needs none of the required variables, so setup commands can open the store
/// before the rest of the configuration exists.
#[must_use]
pub fn load_store_path() -> PathBuf {
    dotenvy::dotenv().ok();
    store_path_with(&|key| std::env::var(key))
}

const DEFAULT_STORE_PATH: &str = "./tagpoints-store.json";

fn store_path_with<F>(lookup: &F) -> PathBuf
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    lookup("TAGPOINTS_STORE_PATH")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_STORE_PATH), PathBuf::from)
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let associate_id = require("TAGPOINTS_ASSOCIATE_ID")?.trim().to_string();

    let env = parse_environment(&or_default("TAGPOINTS_ENV", "development"))?;
    let log_level = or_default("TAGPOINTS_LOG_LEVEL", "info");

    let api_base = or_default("TAGPOINTS_API_BASE", "http://localhost:5001");
    if !(api_base.starts_with("http://") || api_base.starts_with("https://")) {
        return Err(ConfigError::InvalidEnvVar {
            var: "TAGPOINTS_API_BASE".to_string(),
            reason: format!("expected an http(s) URL, got '{api_base}'"),
        });
    }

    let store_path = store_path_with(&lookup);
    let request_timeout_secs = parse_u64("TAGPOINTS_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("TAGPOINTS_USER_AGENT", "tagpoints/0.1 (points-relay)");
    let relay_retry_delay_ms = parse_u64("TAGPOINTS_RELAY_RETRY_DELAY_MS", "2000")?;
    let channel_timeout_secs = parse_u64("TAGPOINTS_CHANNEL_TIMEOUT_SECS", "5")?;
    let rescan_debounce_ms = parse_u64("TAGPOINTS_RESCAN_DEBOUNCE_MS", "500")?;

    Ok(AppConfig {
        env,
        log_level,
        associate_id,
        api_base,
        store_path,
        request_timeout_secs,
        user_agent,
        relay_retry_delay_ms,
        channel_timeout_secs,
        rescan_debounce_ms,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test` or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "TAGPOINTS_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
