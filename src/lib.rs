//! SOAP listener for loyalty-program purchases packages.
//!
//! Accepts `processPurchases`-family SOAP calls, stores each decoded package
//! once per unique content, and always acknowledges in the caller's dialect.

pub mod admin;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod purchases;
pub mod soap;
pub mod storage;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
