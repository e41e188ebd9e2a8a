use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a `PULSE_*` value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the
/// process, without touching `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a `PULSE_*` value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// The parsing/validation logic is decoupled from the process environment so
/// tests can drive it with a plain `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let env = parse_environment(&or_default("PULSE_ENV", "development"));
    let log_level = or_default("PULSE_LOG_LEVEL", "info");
    let sources_path = PathBuf::from(or_default("PULSE_SOURCES_PATH", "./config/sources.yaml"));

    let concurrency_limit = parse_usize("PULSE_CONCURRENCY_LIMIT", "4")?;
    if concurrency_limit == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "PULSE_CONCURRENCY_LIMIT".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    let per_source_retry_count = parse_u32("PULSE_RETRY_COUNT", "3")?;
    let retry_backoff_base_secs = parse_u64("PULSE_RETRY_BACKOFF_BASE_SECS", "1")?;
    let request_timeout_secs = parse_u64("PULSE_REQUEST_TIMEOUT_SECS", "30")?;
    let run_timeout_secs = parse_u64("PULSE_RUN_TIMEOUT_SECS", "300")?;
    let user_agent = or_default("PULSE_USER_AGENT", "livepulse/0.1 (news-intelligence)");
    let max_body_chars = parse_usize("PULSE_MAX_BODY_CHARS", "10000")?;
    let fingerprint_prefix_chars = parse_usize("PULSE_FINGERPRINT_PREFIX_CHARS", "2048")?;
    let inter_request_delay_ms = parse_u64("PULSE_INTER_REQUEST_DELAY_MS", "250")?;

    let db_max_connections = parse_u32("PULSE_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("PULSE_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("PULSE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    Ok(AppConfig {
        env,
        log_level,
        sources_path,
        concurrency_limit,
        per_source_retry_count,
        retry_backoff_base_secs,
        request_timeout_secs,
        run_timeout_secs,
        user_agent,
        max_body_chars,
        fingerprint_prefix_chars,
        inter_request_delay_ms,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}
