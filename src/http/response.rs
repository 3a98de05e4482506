//! SOAP response framing.
//!
//! Every SOAP reply is 200 with `text/xml; charset=utf-8`, whatever happened
//! while processing the request.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::soap::SOAP_CONTENT_TYPE;

/// Wrap an envelope in the HTTP response the client expects.
pub fn soap_response(envelope: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, SOAP_CONTENT_TYPE)],
        envelope,
    )
        .into_response()
}
