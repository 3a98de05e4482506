//! SOAP method and protocol version identities.

use std::fmt;

/// SOAP 1.1 envelope namespace.
pub const SOAP_11_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// SOAP 1.2 envelope namespace.
pub const SOAP_12_ENVELOPE_NS: &str = "http://www.w3.org/2003/05/soap-envelope";

/// Short marker some clients use instead of the full SOAP 1.2 namespace.
pub const SOAP_12_SHORT_MARKER: &str = "soap/envelope/12";

/// Namespace used when the request does not declare one on the method tag.
pub const DEFAULT_NAMESPACE: &str = "http://purchases.erpi.crystals.ru";

/// The fixed set of methods the loyalty client calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SoapMethod {
    #[default]
    ProcessPurchases,
    ProcessPurchasesWithTi,
    ProcessCancelledPurchases,
    ProcessCancelledPurchasesWithTi,
}

impl SoapMethod {
    /// All methods, longest name first so that prefix-sharing names
    /// never shadow each other when used as regex alternatives.
    pub const ALL: [SoapMethod; 4] = [
        SoapMethod::ProcessCancelledPurchasesWithTi,
        SoapMethod::ProcessCancelledPurchases,
        SoapMethod::ProcessPurchasesWithTi,
        SoapMethod::ProcessPurchases,
    ];

    /// Canonical (proper-cased) element name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SoapMethod::ProcessPurchases => "processPurchases",
            SoapMethod::ProcessPurchasesWithTi => "processPurchasesWithTI",
            SoapMethod::ProcessCancelledPurchases => "processCancelledPurchases",
            SoapMethod::ProcessCancelledPurchasesWithTi => "processCancelledPurchasesWithTI",
        }
    }

    /// Name of the element wrapping the acknowledgment.
    pub fn response_element(&self) -> &'static str {
        match self {
            SoapMethod::ProcessPurchases => "processPurchasesResponse",
            SoapMethod::ProcessPurchasesWithTi => "processPurchasesWithTIResponse",
            SoapMethod::ProcessCancelledPurchases => "processCancelledPurchasesResponse",
            SoapMethod::ProcessCancelledPurchasesWithTi => {
                "processCancelledPurchasesWithTIResponse"
            }
        }
    }

    /// Case-insensitive lookup by local element name.
    pub fn from_local_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for SoapMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SOAP protocol version detected from the request envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SoapVersion {
    #[default]
    V1_1,
    V1_2,
}

impl SoapVersion {
    /// Envelope namespace for this version.
    pub fn envelope_namespace(&self) -> &'static str {
        match self {
            SoapVersion::V1_1 => SOAP_11_ENVELOPE_NS,
            SoapVersion::V1_2 => SOAP_12_ENVELOPE_NS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SoapVersion::V1_1 => "1.1",
            SoapVersion::V1_2 => "1.2",
        }
    }
}

impl fmt::Display for SoapVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
