//! Configuration validation.
//!
//! # Responsibilities
//! - Checks value ranges and addresses; parsing is left to serde
//! - Validate addresses and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Pure function: `EngineConfig → Result<(), Vec<ValidationError>>`

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::EngineConfig;

/// One semantic problem in a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("source.path must not be empty")]
    EmptySourcePath,
}

pub fn validate_config(config: &EngineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.source.path.trim().is_empty() {
        errors.push(ValidationError::EmptySourcePath);
    }
    if config.source.watch && config.source.poll_interval_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "source.poll_interval_secs",
        });
    }
    if config.model.max_batch_paths == 0 {
        errors.push(ValidationError::Zero {
            field: "model.max_batch_paths",
        });
    }
    if config.server.enabled {
        check_address(&mut errors, "server.bind_address", &config.server.bind_address);
        if config.server.request_timeout_secs == 0 {
            errors.push(ValidationError::Zero {
                field: "server.request_timeout_secs",
            });
        }
    }
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&EngineConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = EngineConfig::default();
        config.source.path = " ".into();
        config.server.bind_address = "nowhere".into();
        config.server.request_timeout_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::EmptySourcePath));
    }

    #[test]
    fn test_disabled_sections_are_not_checked() {
        let mut config = EngineConfig::default();
        config.server.enabled = false;
        config.server.bind_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());
    }
}
