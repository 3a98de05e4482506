//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, environment overrides)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → handed to HttpServer and the store at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, CONFIG_PATH_ENV};
pub use schema::{
    AdminConfig, ListenerConfig, LogFormat, ObservabilityConfig, ServiceConfig, SoapConfig,
    StorageBackend, StorageConfig, TimeoutConfig,
};
pub use validation::ValidationError;
