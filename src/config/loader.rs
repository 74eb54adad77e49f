//! Configuration loading from disk and process environment.

use std::fs;
use std::path::Path;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {name}: '{value}'")]
    Env { name: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply environment overrides,
/// then validate.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => AppConfig::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables on top of file/default values.
///
/// `lookup` abstracts the environment so tests do not touch process state.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("MONGO_URL") {
        config.database.url = Some(url);
    }

    if let Some(port) = lookup("PORT") {
        let port: u16 = parse_env("PORT", port)?;
        let host = config
            .listener
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        config.listener.bind_address = format!("{host}:{port}");
    }

    let db = &mut config.database;
    let numeric: [(&'static str, &mut u64); 3] = [
        ("DB_SERVER_SELECTION_TIMEOUT_MS", &mut db.server_selection_timeout_ms),
        ("DB_SOCKET_TIMEOUT_MS", &mut db.socket_timeout_ms),
        ("DB_CONNECT_TIMEOUT_MS", &mut db.connect_timeout_ms),
    ];
    for (name, slot) in numeric {
        if let Some(value) = lookup(name) {
            *slot = parse_env(name, value)?;
        }
    }

    if let Some(value) = lookup("DB_MAX_POOL_SIZE") {
        db.max_pool_size = parse_env("DB_MAX_POOL_SIZE", value)?;
    }

    if let Some(value) = lookup("DB_EAGER_CONNECT") {
        db.eager_connect = parse_env("DB_EAGER_CONNECT", value)?;
    }

    if let Some(level) = lookup("LOG_LEVEL") {
        config.observability.log_level = level;
    }

    if let Some(format) = lookup("LOG_FORMAT") {
        config.observability.log_format = format;
    }

    Ok(())
}

fn parse_env<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { name, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("MONGO_URL", "mongodb://db:27017/social"),
                ("PORT", "8080"),
                ("DB_CONNECT_TIMEOUT_MS", "1500"),
                ("DB_MAX_POOL_SIZE", "4"),
                ("LOG_FORMAT", "json"),
            ]),
        )
        .unwrap();

        assert_eq!(config.database.target(), Some("mongodb://db:27017/social"));
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.database.connect_timeout_ms, 1500);
        assert_eq!(config.database.max_pool_size, 4);
        assert_eq!(config.database.socket_timeout_ms, 45_000);
        assert_eq!(config.observability.log_format, "json");
    }

    #[test]
    fn test_bad_number_is_reported() {
        let mut config = AppConfig::default();
        let err = apply_env_overrides(&mut config, env(&[("DB_SOCKET_TIMEOUT_MS", "soon")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Env { name: "DB_SOCKET_TIMEOUT_MS", .. }
        ));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("social-backend-{}.toml", uuid::Uuid::new_v4()));
        fs::write(
            &path,
            "[database]\nprobe_timeout_ms = 250\npoll_interval_ms = 50\n\
             [observability]\nmetrics_enabled = true\nmetrics_address = \"127.0.0.1:9100\"\n",
        )
        .unwrap();

        // None of these fields have environment overrides.
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.database.probe_timeout_ms, 250);
        assert_eq!(config.database.poll_interval_ms, 50);
        assert_eq!(config.database.close_timeout_ms, 5_000);
        assert!(config.observability.metrics_enabled);
        assert_eq!(config.observability.metrics_address, "127.0.0.1:9100");

        fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_validation_failure_is_fatal() {
        let path = std::env::temp_dir().join(format!("social-backend-{}.toml", uuid::Uuid::new_v4()));
        fs::write(&path, "[database]\nmax_pool_size = 0\n").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        fs::remove_file(&path).unwrap_or_default();
    }
}
