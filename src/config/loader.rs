//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ClientSettings;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

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

/// Parse and validate settings from TOML text.
pub fn parse_config(content: &str) -> Result<ClientSettings, ConfigError> {
    let settings: ClientSettings = toml::from_str(content)?;
    validate_config(&settings).map_err(ConfigError::Validation)?;
    Ok(settings)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ClientSettings, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_config() {
        let settings = parse_config(
            r#"
            [client]
            base_destination = "http://127.0.0.1:9000"
            max_retry_attempts = 1

            [persistence]
            backend = "file"
            path = "/tmp/breakers.json"
            "#,
        )
        .unwrap();
        assert_eq!(settings.client.max_retry_attempts, 1);
        assert_eq!(settings.persistence.path, "/tmp/breakers.json");
    }

    #[test]
    fn test_validation_error_message() {
        let err = parse_config(
            r#"
            [circuit_breaker]
            failure_threshold = 0
            timeout_ms = 0
            "#,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation failed: circuit_breaker.failure_threshold: must be greater than 0, \
             circuit_breaker.timeout_ms: must be greater than 0"
        );
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_syntax_error() {
        let err = parse_config("[client\nbase_destination = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
