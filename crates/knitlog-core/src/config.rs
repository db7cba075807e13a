use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
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
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Every variable has a default, so an empty environment yields a usable
/// heuristic-only configuration.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
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

    let env = parse_environment(&or_default("KNITLOG_ENV", "development"))?;
    let log_level = or_default("KNITLOG_LOG_LEVEL", "info");
    let trace_dir = PathBuf::from(or_default("KNITLOG_TRACE_DIR", "./import_traces"));
    let trace_blob_limit = parse_usize("KNITLOG_TRACE_BLOB_LIMIT", "20000")?;

    let fetch_timeout_secs = parse_u64("KNITLOG_FETCH_TIMEOUT_SECS", "20")?;
    let fetch_max_retries = parse_u32("KNITLOG_FETCH_MAX_RETRIES", "0")?;
    let fetch_retry_backoff_base_secs = parse_u64("KNITLOG_FETCH_RETRY_BACKOFF_BASE_SECS", "1")?;
    let user_agent = or_default("KNITLOG_USER_AGENT", "knitlog/0.1 (pattern-import)");

    let ai_enabled = parse_bool("KNITLOG_AI_ENABLED", &or_default("KNITLOG_AI_ENABLED", "false"))?;
    let ai_api_key = lookup("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty());
    let ai_model = or_default("KNITLOG_AI_MODEL", "gpt-4o-mini");
    let ai_base_url = or_default("KNITLOG_AI_BASE_URL", "https://api.openai.com/v1");
    let ai_timeout_secs = parse_u64("KNITLOG_AI_TIMEOUT_SECS", "60")?;
    let ai_max_input_chars = parse_usize("KNITLOG_AI_MAX_INPUT_CHARS", "12000")?;

    if fetch_timeout_secs == 0 {
        return Err(invalid(
            "KNITLOG_FETCH_TIMEOUT_SECS",
            "must be greater than zero".to_string(),
        ));
    }
    if ai_timeout_secs == 0 {
        return Err(invalid(
            "KNITLOG_AI_TIMEOUT_SECS",
            "must be greater than zero".to_string(),
        ));
    }

    Ok(AppConfig {
        env,
        log_level,
        trace_dir,
        trace_blob_limit,
        fetch_timeout_secs,
        fetch_max_retries,
        fetch_retry_backoff_base_secs,
        user_agent,
        ai_enabled,
        ai_api_key,
        ai_model,
        ai_base_url,
        ai_timeout_secs,
        ai_max_input_chars,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for unrecognized values.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "KNITLOG_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
