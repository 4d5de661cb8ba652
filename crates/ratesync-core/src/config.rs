use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Smallest accepted rating refresh interval, in minutes.
pub const MIN_INTERVAL_MINUTES: u32 = 1;
/// Largest accepted rating refresh interval (one day), in minutes.
pub const MAX_INTERVAL_MINUTES: u32 = 1440;

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

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing and validation are decoupled from the real environment so they can
/// be exercised with a plain `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = require("DATABASE_URL")?;
    let reviews_url = require("RATESYNC_REVIEWS_URL")?;
    let redis_url = or_default("REDIS_URL", "redis://127.0.0.1:6379");

    let env = parse_environment(&or_default("RATESYNC_ENV", "development"))?;
    let bind_addr = parse_addr("RATESYNC_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("RATESYNC_LOG_LEVEL", "info");
    let api_keys = parse_api_keys(&or_default("RATESYNC_API_KEYS", ""));

    let db_max_connections = parse_u32("RATESYNC_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("RATESYNC_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("RATESYNC_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let reviews_timeout_secs = parse_u64("RATESYNC_REVIEWS_TIMEOUT_SECS", "10")?;
    let reviews_user_agent = or_default("RATESYNC_REVIEWS_USER_AGENT", "ratesync/0.1 (vendor-ratings)");

    let rating_interval_minutes = parse_u32("RATESYNC_RATING_INTERVAL_MINUTES", "60")?;
    if !(MIN_INTERVAL_MINUTES..=MAX_INTERVAL_MINUTES).contains(&rating_interval_minutes) {
        return Err(invalid(
            "RATESYNC_RATING_INTERVAL_MINUTES",
            format!(
                "must be between {MIN_INTERVAL_MINUTES} and {MAX_INTERVAL_MINUTES}, got {rating_interval_minutes}"
            ),
        ));
    }

    let rating_batch_size = parse_usize("RATESYNC_RATING_BATCH_SIZE", "10")?;
    if rating_batch_size == 0 {
        return Err(invalid(
            "RATESYNC_RATING_BATCH_SIZE",
            "must be at least 1".to_string(),
        ));
    }
    let rating_batch_delay_ms = parse_u64("RATESYNC_RATING_BATCH_DELAY_MS", "1000")?;

    let scheduler_warmup_secs = parse_u64("RATESYNC_SCHEDULER_WARMUP_SECS", "10")?;
    let scheduler_boot_delay_secs = parse_u64("RATESYNC_SCHEDULER_BOOT_DELAY_SECS", "5")?;
    let scheduler_autostart = parse_bool(
        "RATESYNC_SCHEDULER_AUTOSTART",
        &or_default("RATESYNC_SCHEDULER_AUTOSTART", "true"),
    )?;

    Ok(AppConfig {
        database_url,
        redis_url,
        reviews_url,
        env,
        bind_addr,
        log_level,
        api_keys,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        reviews_timeout_secs,
        reviews_user_agent,
        rating_interval_minutes,
        rating_batch_size,
        rating_batch_delay_ms,
        scheduler_warmup_secs,
        scheduler_boot_delay_secs,
        scheduler_autostart,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "RATESYNC_ENV".to_string(),
            reason: format!("expected development, test, or production, got '{other}'"),
        }),
    }
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}

/// Comma-separated bearer tokens; blanks are dropped.
fn parse_api_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
