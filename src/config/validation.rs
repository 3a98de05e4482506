//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, body limit > 0, addresses parse)
//! - Refuse insecure admin settings
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{ServiceConfig, StorageBackend, PLACEHOLDER_API_KEY};

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: '{value}' is not a socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("listener.soap_path must start with '/', got '{0}'")]
    InvalidSoapPath(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("storage.url is required for the postgres backend")]
    MissingDatabaseUrl,

    #[error("soap.fallback_namespace must not be empty")]
    EmptyNamespace,

    #[error("admin.api_key must be set when admin is enabled")]
    InsecureAdminKey,
}

/// Check a loaded configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if !config.listener.soap_path.starts_with('/') {
        errors.push(ValidationError::InvalidSoapPath(config.listener.soap_path.clone()));
    }
    if config.listener.max_body_size == 0 {
        errors.push(ValidationError::Zero("listener.max_body_size"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }
    if config.soap.fallback_namespace.trim().is_empty() {
        errors.push(ValidationError::EmptyNamespace);
    }
    if config.storage.backend == StorageBackend::Postgres {
        if config.storage.url.trim().is_empty() {
            errors.push(ValidationError::MissingDatabaseUrl);
        }
        if config.storage.max_pool_size == 0 {
            errors.push(ValidationError::Zero("storage.max_pool_size"));
        }
        if config.storage.connect_timeout_secs == 0 {
            errors.push(ValidationError::Zero("storage.connect_timeout_secs"));
        }
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }
    if config.admin.enabled
        && (config.admin.api_key.trim().is_empty() || config.admin.api_key == PLACEHOLDER_API_KEY)
    {
        errors.push(ValidationError::InsecureAdminKey);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(validate_config(&ServiceConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = ServiceConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.listener.soap_path = "soap".into();
        config.timeouts.request_secs = 0;
        config.admin.enabled = true;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::InsecureAdminKey));
        assert!(errors.contains(&ValidationError::Zero("timeouts.request_secs")));
    }

    #[test]
    fn test_memory_backend_needs_no_url() {
        let mut config = ServiceConfig::default();
        config.storage.backend = StorageBackend::Memory;
        config.storage.url.clear();
        assert!(validate_config(&config).is_ok());
    }
}
