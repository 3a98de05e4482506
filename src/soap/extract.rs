//! Tolerant envelope extraction.
//!
//! # Responsibilities
//! - Detect the SOAP version from envelope namespace markers
//! - Identify the called method and its namespace
//! - Pull the base64 `purchases` payload and optional `version` label
//!
//! # Design Decisions
//! - Pattern matching over raw text, not an XML parser: the client sends
//!   envelopes that strict parsers reject, and those must still be served
//! - Every field has an explicit fallback; extraction never fails
//! - First match wins for repeated elements

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::soap::method::{SoapMethod, SoapVersion, SOAP_12_ENVELOPE_NS, SOAP_12_SHORT_MARKER};

/// Everything recovered from an inbound envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeDescriptor {
    /// Called method, if one of the known four was found.
    pub method: Option<SoapMethod>,
    /// Namespace bound on the method tag, or the fallback.
    pub namespace: String,
    pub soap_version: SoapVersion,
    /// Trimmed base64 text of the first `purchases` element.
    pub payload: Option<String>,
    /// Trimmed text of the first `version` element.
    pub version: Option<String>,
}

impl EnvelopeDescriptor {
    /// Descriptor with nothing found.
    pub fn empty(fallback_namespace: &str) -> Self {
        Self {
            method: None,
            namespace: fallback_namespace.to_string(),
            soap_version: SoapVersion::default(),
            payload: None,
            version: None,
        }
    }
}

struct Patterns {
    method_tag: Regex,
    ns_prefixed: Regex,
    ns_default: Regex,
    purchases: Regex,
    version: Regex,
}

impl Patterns {
    fn compile() -> Result<Self, regex::Error> {
        let methods = SoapMethod::ALL
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join("|");

        Ok(Self {
            method_tag: Regex::new(&format!(r"(?i)<([\w.-]+:)?({methods})\b([^>]*)>"))?,
            ns_prefixed: Regex::new(r#"xmlns:([^=\s]+)\s*=\s*["']([^"']+)["']"#)?,
            ns_default: Regex::new(r#"\bxmlns\s*=\s*["']([^"']+)["']"#)?,
            purchases: text_element("purchases")?,
            version: text_element("version")?,
        })
    }
}

/// Element with the given local name (any prefix) holding text only.
fn text_element(local_name: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"(?i)<(?:[\w.-]+:)?{local_name}(?:\s[^>]*)?>([^<]+)</(?:[\w.-]+:)?{local_name}\s*>"
    ))
}

static PATTERNS: LazyLock<Result<Patterns, regex::Error>> = LazyLock::new(Patterns::compile);

/// Scans raw request bodies for the pieces the response and storage need.
#[derive(Debug, Clone)]
pub struct EnvelopeExtractor {
    fallback_namespace: String,
}

impl EnvelopeExtractor {
    pub fn new(fallback_namespace: impl Into<String>) -> Self {
        Self {
            fallback_namespace: fallback_namespace.into(),
        }
    }

    pub fn fallback_namespace(&self) -> &str {
        &self.fallback_namespace
    }

    /// Extract a descriptor from the raw body. Invalid UTF-8 is replaced,
    /// missing pieces fall back to defaults.
    pub fn extract(&self, body: &[u8]) -> EnvelopeDescriptor {
        let patterns = match PATTERNS.as_ref() {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "Envelope patterns failed to compile");
                return EnvelopeDescriptor::empty(&self.fallback_namespace);
            }
        };

        let text = String::from_utf8_lossy(body);
        let mut descriptor = EnvelopeDescriptor::empty(&self.fallback_namespace);
        descriptor.soap_version = detect_version(&text);

        if let Some(caps) = patterns.method_tag.captures(&text) {
            descriptor.method = caps
                .get(2)
                .and_then(|m| SoapMethod::from_local_name(m.as_str()));

            let attrs = caps.get(3).map_or("", |m| m.as_str());
            if let Some(ns) = discover_namespace(patterns, attrs) {
                descriptor.namespace = ns;
            }
        }

        descriptor.payload = first_text(&patterns.purchases, &text);
        descriptor.version = first_text(&patterns.version, &text);
        descriptor
    }
}

fn detect_version(text: &str) -> SoapVersion {
    let lowered = text.to_ascii_lowercase();
    if lowered.contains(SOAP_12_ENVELOPE_NS) || lowered.contains(SOAP_12_SHORT_MARKER) {
        SoapVersion::V1_2
    } else {
        SoapVersion::V1_1
    }
}

/// Prefixed declaration first, then the default one.
fn discover_namespace(patterns: &Patterns, attrs: &str) -> Option<String> {
    if let Some(caps) = patterns.ns_prefixed.captures(attrs) {
        return group(&caps, 2);
    }
    patterns
        .ns_default
        .captures(attrs)
        .and_then(|caps| group(&caps, 1))
}

fn first_text(re: &Regex, text: &str) -> Option<String> {
    let caps = re.captures(text)?;
    let value = caps.get(1)?.as_str().trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn group(caps: &Captures<'_>, index: usize) -> Option<String> {
    caps.get(index).map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soap::method::DEFAULT_NAMESPACE;

    fn extractor() -> EnvelopeExtractor {
        EnvelopeExtractor::new(DEFAULT_NAMESPACE)
    }

    #[test]
    fn test_bare_method_without_envelope() {
        let body = b"<processPurchases><purchases>SGVsbG8=</purchases><version>2.1</version></processPurchases>";
        let d = extractor().extract(body);

        assert_eq!(d.method, Some(SoapMethod::ProcessPurchases));
        assert_eq!(d.namespace, DEFAULT_NAMESPACE);
        assert_eq!(d.soap_version, SoapVersion::V1_1);
        assert_eq!(d.payload.as_deref(), Some("SGVsbG8="));
        assert_eq!(d.version.as_deref(), Some("2.1"));
    }

    #[test]
    fn test_soap12_prefixed_namespace() {
        let body = br#"<?xml version="1.0" encoding="UTF-8"?>
<env:Envelope xmlns:env="http://www.w3.org/2003/05/soap-envelope">
  <env:Body>
    <ns2:processCancelledPurchasesWithTI xmlns:ns2="urn:example">
      <ns2:purchases>
        SGVsbG8=
      </ns2:purchases>
    </ns2:processCancelledPurchasesWithTI>
  </env:Body>
</env:Envelope>"#;
        let d = extractor().extract(body);

        assert_eq!(d.method, Some(SoapMethod::ProcessCancelledPurchasesWithTi));
        assert_eq!(d.namespace, "urn:example");
        assert_eq!(d.soap_version, SoapVersion::V1_2);
        assert_eq!(d.payload.as_deref(), Some("SGVsbG8="));
        assert_eq!(d.version, None);
    }

    #[test]
    fn test_default_namespace_declaration() {
        let body = br#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/">
<soapenv:Body><processPurchasesWithTI xmlns='urn:loyalty'><purchases>QQ==</purchases></processPurchasesWithTI></soapenv:Body>
</soapenv:Envelope>"#;
        let d = extractor().extract(body);

        assert_eq!(d.method, Some(SoapMethod::ProcessPurchasesWithTi));
        assert_eq!(d.namespace, "urn:loyalty");
        assert_eq!(d.soap_version, SoapVersion::V1_1);
    }

    #[test]
    fn test_method_match_is_case_insensitive() {
        let d = extractor().extract(b"<p:PROCESSCANCELLEDPURCHASES xmlns:p=\"urn:x\"/>");
        assert_eq!(d.method, Some(SoapMethod::ProcessCancelledPurchases));
        assert_eq!(d.namespace, "urn:x");
    }

    #[test]
    fn test_first_purchases_element_wins() {
        let body = b"<processPurchases><purchases>Rmlyc3Q=</purchases><purchases>U2Vjb25k</purchases></processPurchases>";
        let d = extractor().extract(body);
        assert_eq!(d.payload.as_deref(), Some("Rmlyc3Q="));
    }

    #[test]
    fn test_short_soap12_marker() {
        let d = extractor().extract(b"<Envelope xmlns=\"urn:soap/envelope/12\"></Envelope>");
        assert_eq!(d.soap_version, SoapVersion::V1_2);
    }

    #[test]
    fn test_garbage_yields_defaults() {
        let d = extractor().extract(&[0xff, 0xfe, b'<', b'<', b'>', 0x00]);
        assert_eq!(d, EnvelopeDescriptor::empty(DEFAULT_NAMESPACE));
    }

    #[test]
    fn test_blank_payload_counts_as_missing() {
        let d = extractor().extract(b"<processPurchases><purchases>   </purchases></processPurchases>");
        assert_eq!(d.payload, None);
    }

    #[test]
    fn test_unknown_method_keeps_fallback_namespace() {
        let d = extractor().extract(b"<ns:doSomething xmlns:ns=\"urn:other\"><purchases>QQ==</purchases></ns:doSomething>");
        assert_eq!(d.method, None);
        assert_eq!(d.namespace, DEFAULT_NAMESPACE);
        assert_eq!(d.payload.as_deref(), Some("QQ=="));
    }
}
