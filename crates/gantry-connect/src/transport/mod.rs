//! HTTP transport layer
//!
//! A single [`HttpTransport`] contract with two interchangeable backends:
//! [`NativeTransport`] (reqwest) and [`CurlTransport`] (subprocess). The
//! backend is chosen at client construction; nothing downstream inspects
//! which one is in use.

mod curl;
mod native;

pub use curl::CurlTransport;
pub use native::NativeTransport;

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// HTTP method for a transport request.
///
/// Only the verbs this API uses; keeps the curl backend's argument mapping
/// exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transport request: method, absolute URL, headers, optional body.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }
}

/// A transport response: status code and raw body bytes.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Low-level failure categories, used by retry classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// TLS handshake or certificate verification failure
    Tls,
    /// Certificate revocation list could not be fetched; the chain itself
    /// was not rejected. Only produced under
    /// [`TlsVerification::TolerateCrlOutage`].
    ///
    /// [`TlsVerification::TolerateCrlOutage`]: crate::config::TlsVerification
    CrlUnavailable,
    /// Connection reset or refused
    ConnectionReset,
    /// Connect or read timeout
    Timeout,
    /// DNS resolution failure
    Dns,
    /// Anything else (including subprocess failures)
    Other,
}

/// A failure below the HTTP layer: no status code was received.
#[derive(Debug, Clone, Error)]
#[error("{kind:?} fault: {message}")]
pub struct TransportFault {
    pub kind: FaultKind,
    pub message: String,
}

impl TransportFault {
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Whether this fault is worth retrying.
    ///
    /// Everything except `Other` is transient: TLS handshakes, resets,
    /// timeouts and DNS failures all recover in practice. A revoked
    /// certificate classifies as `Other` and is terminal.
    pub fn is_transient(&self) -> bool {
        !matches!(self.kind, FaultKind::Other)
    }
}

/// Transport contract shared by the native and subprocess backends.
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue one HTTP request and return the status and body.
    ///
    /// A response with a non-2xx status is still `Ok`; `Err` means no
    /// response was received at all.
    async fn execute(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportFault>;
}

/// Classify an error message from a TLS backend, honoring CRL tolerance.
///
/// Both backends funnel their certificate errors through here so the two
/// report identical fault kinds for identical failures.
pub(crate) fn classify_tls_message(message: &str, tolerate_crl_outage: bool) -> FaultKind {
    let lower = message.to_lowercase();
    if lower.contains("revoked") {
        // Revocation is a verdict, not an outage.
        return FaultKind::Other;
    }
    if tolerate_crl_outage
        && (lower.contains("crl") || lower.contains("revocation list"))
        && (lower.contains("unavailable")
            || lower.contains("could not")
            || lower.contains("failed to fetch")
            || lower.contains("download"))
    {
        return FaultKind::CrlUnavailable;
    }
    FaultKind::Tls
}

/// Test doubles shared across the crate's unit tests.
#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::{HttpRequest, HttpResponse, HttpTransport, TransportFault};

    /// Scripted transport: pops one outcome per call and records requests.
    pub(crate) struct ScriptedTransport {
        script: Mutex<Vec<Result<HttpResponse, TransportFault>>>,
        calls: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        pub(crate) fn new(outcomes: Vec<Result<HttpResponse, TransportFault>>) -> Self {
            let mut script = outcomes;
            script.reverse();
            Self {
                script: Mutex::new(script),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn attempts(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub(crate) fn requests(&self) -> Vec<HttpRequest> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportFault> {
            self.calls.lock().unwrap().push(request);
            self.script
                .lock()
                .unwrap()
                .pop()
                .expect("scripted transport exhausted")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_strings() {
        assert_eq!(Method::Get.as_str(), "GET");
        assert_eq!(Method::Put.as_str(), "PUT");
        assert_eq!(Method::Patch.to_string(), "PATCH");
    }

    #[test]
    fn success_range() {
        assert!(HttpResponse { status: 200, body: vec![] }.is_success());
        assert!(HttpResponse { status: 204, body: vec![] }.is_success());
        assert!(!HttpResponse { status: 301, body: vec![] }.is_success());
        assert!(!HttpResponse { status: 404, body: vec![] }.is_success());
    }

    #[test]
    fn crl_outage_is_tolerated_only_when_enabled() {
        let msg = "CRL distribution point download failed: connection timed out";
        assert_eq!(classify_tls_message(msg, true), FaultKind::CrlUnavailable);
        assert_eq!(classify_tls_message(msg, false), FaultKind::Tls);
    }

    #[test]
    fn revoked_certificate_is_never_tolerated() {
        let msg = "certificate has been revoked (CRL entry found)";
        assert_eq!(classify_tls_message(msg, true), FaultKind::Other);
        assert_eq!(classify_tls_message(msg, false), FaultKind::Other);
    }

    #[test]
    fn transient_faults() {
        assert!(TransportFault::new(FaultKind::Timeout, "t").is_transient());
        assert!(TransportFault::new(FaultKind::ConnectionReset, "r").is_transient());
        assert!(TransportFault::new(FaultKind::Dns, "d").is_transient());
        assert!(TransportFault::new(FaultKind::CrlUnavailable, "c").is_transient());
        assert!(!TransportFault::new(FaultKind::Other, "o").is_transient());
    }
}
