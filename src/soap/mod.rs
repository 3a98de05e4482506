//! SOAP protocol layer.
//!
//! # Data Flow
//! ```text
//! raw request bytes
//!     → extract.rs (version, method, namespace, payload, version label)
//!     → [purchases pipeline: decode, dedup, persist]
//!     → response.rs (envelope mirroring the request dialect)
//! ```
//!
//! # Design Decisions
//! - Extraction is text scanning with fallbacks, never a strict parse
//! - Responses always acknowledge with `true`

pub mod extract;
pub mod method;
pub mod response;

pub use extract::{EnvelopeDescriptor, EnvelopeExtractor};
pub use method::{SoapMethod, SoapVersion, DEFAULT_NAMESPACE};
pub use response::{ResponseBuilder, SOAP_CONTENT_TYPE};
