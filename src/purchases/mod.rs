//! Purchases package pipeline.
//!
//! # Data Flow
//! ```text
//! base64 payload
//!     → decoder.rs (base64 → UTF-8 text)
//!     → fingerprint.rs (SHA-256 content digest)
//!     → processor.rs (dedup lookup, insert)
//!     → summary.rs (root `count` hint, stored alongside)
//! ```

pub mod decoder;
pub mod fingerprint;
pub mod processor;
pub mod summary;

pub use decoder::{decode_payload, DecodeError};
pub use fingerprint::ContentDigest;
pub use processor::{ProcessOutcome, PurchaseProcessor};
pub use summary::summarize;
