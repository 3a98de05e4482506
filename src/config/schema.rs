//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the listener.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::soap::method::DEFAULT_NAMESPACE;

/// Root configuration for the purchases listener.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address, SOAP path, body limit).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// SOAP dialect settings.
    pub soap: SoapConfig,

    /// Record storage.
    pub storage: StorageConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Administrative API.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,

    /// Path the SOAP endpoint is served on.
    pub soap_path: String,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            soap_path: "/soap".to_string(),
            max_body_size: 16 * 1024 * 1024, // 16MB
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Admin request timeout in seconds. The SOAP endpoint has no deadline.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// SOAP dialect settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SoapConfig {
    /// Namespace used in responses when the request declares none.
    pub fallback_namespace: String,
}

impl Default for SoapConfig {
    fn default() -> Self {
        Self {
            fallback_namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

/// Which store backs the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    /// PostgreSQL connection URL.
    pub url: String,

    /// Maximum number of pooled connections.
    pub max_pool_size: usize,

    /// Longest wait for a pooled connection, and for opening one, in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Postgres,
            url: "postgresql://postgres:postgres@db:5432/soaplistener".to_string(),
            max_pool_size: 10,
            connect_timeout_secs: 5,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Administrative API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Serve `/admin/*` routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

/// Placeholder key that validation refuses when admin is enabled.
pub const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_API_KEY.to_string(),
        }
    }
}
