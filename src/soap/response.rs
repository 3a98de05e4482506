//! Acknowledgment envelope construction.
//!
//! The client only accepts a response that mirrors its own request: the same
//! SOAP version, the method's `...Response` element, and that element bound
//! to the namespace it called with. The return value is always `true`; a
//! negative acknowledgment only makes the client resend the same package.

use std::borrow::Cow;

use crate::soap::extract::EnvelopeDescriptor;
use crate::soap::method::{SoapMethod, SoapVersion};

/// Prefix bound to the request namespace on the response element.
pub const RESPONSE_PREFIX: &str = "ns2";

/// Prefix of the envelope elements, in both SOAP versions.
pub const ENVELOPE_PREFIX: &str = "soap";

/// Content type of every SOAP response.
pub const SOAP_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// Builds success envelopes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseBuilder;

impl ResponseBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Envelope mirroring what was extracted from the request.
    pub fn for_request(&self, descriptor: &EnvelopeDescriptor) -> String {
        self.build(
            descriptor.method,
            &descriptor.namespace,
            descriptor.soap_version,
        )
    }

    /// Build the envelope. Unknown methods answer as `processPurchases`.
    pub fn build(
        &self,
        method: Option<SoapMethod>,
        namespace: &str,
        soap_version: SoapVersion,
    ) -> String {
        let element = method.unwrap_or_default().response_element();
        let namespace = escape_attribute(namespace);
        let p = RESPONSE_PREFIX;
        let env = ENVELOPE_PREFIX;
        let envelope_ns = soap_version.envelope_namespace();

        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <{env}:Envelope xmlns:{env}=\"{envelope_ns}\">\n\
             \x20 <{env}:Body>\n\
             \x20   <{p}:{element} xmlns:{p}=\"{namespace}\"><{p}:return>true</{p}:return></{p}:{element}>\n\
             \x20 </{env}:Body>\n\
             </{env}:Envelope>"
        )
    }
}

/// Namespaces come from attribute text and never contain quotes. A stray
/// `<` or an `&` that does not begin an entity reference would make the
/// envelope malformed.
fn escape_attribute(value: &str) -> Cow<'_, str> {
    if !value.contains(['<', '&']) {
        return Cow::Borrowed(value);
    }

    let mut escaped = String::with_capacity(value.len() + 8);
    for (i, c) in value.char_indices() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '&' if !starts_entity(&value[i..]) => escaped.push_str("&amp;"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

/// A predefined entity (`&amp;` etc.) or a character reference at the start
/// of `text`.
fn starts_entity(text: &str) -> bool {
    let Some(end) = text.find(';') else {
        return false;
    };
    let body = &text[1..end];
    if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
        !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit())
    } else if let Some(dec) = body.strip_prefix('#') {
        !dec.is_empty() && dec.chars().all(|c| c.is_ascii_digit())
    } else {
        matches!(body, "amp" | "lt" | "gt" | "quot" | "apos")
    }
}
