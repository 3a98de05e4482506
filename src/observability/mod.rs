//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! SOAP handler, processor, store:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, JSON lines)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through handler logs
//! - Logs and metrics are the only channel for failures

pub mod logging;
pub mod metrics;
