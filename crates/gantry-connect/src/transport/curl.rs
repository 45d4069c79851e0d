//! Subprocess HTTP backend driving `curl`
//!
//! Same external contract as the native backend: status plus body bytes, or
//! a classified fault. Useful where the process cannot carry its own TLS
//! stack or an operator wants curl's proxy/CA handling.

use std::process::Stdio;

use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::debug;

use crate::config::TlsVerification;

use super::{
    classify_tls_message, FaultKind, HttpRequest, HttpResponse, HttpTransport, TransportFault,
};

// curl exit codes, from curl(1).
const EXIT_DNS: i32 = 6;
const EXIT_CONNECT: i32 = 7;
const EXIT_TIMEOUT: i32 = 28;
const EXIT_SSL_CONNECT: i32 = 35;
const EXIT_RECV: i32 = 56;
const EXIT_CERT_VERIFY: i32 = 60;

/// Subprocess HTTP backend.
pub struct CurlTransport {
    tls: TlsVerification,
}

impl CurlTransport {
    pub fn new(tls: TlsVerification) -> Result<Self, TransportFault> {
        if !Self::is_curl_available() {
            return Err(TransportFault::new(
                FaultKind::Other,
                "curl not found on PATH",
            ));
        }
        Ok(Self { tls })
    }

    fn is_curl_available() -> bool {
        std::process::Command::new("curl")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn classify_exit(&self, code: i32, stderr: &str) -> FaultKind {
        match code {
            EXIT_DNS => FaultKind::Dns,
            EXIT_CONNECT | EXIT_RECV => FaultKind::ConnectionReset,
            EXIT_TIMEOUT => FaultKind::Timeout,
            EXIT_SSL_CONNECT | EXIT_CERT_VERIFY => {
                classify_tls_message(stderr, self.tls == TlsVerification::TolerateCrlOutage)
            }
            _ => FaultKind::Other,
        }
    }
}

#[async_trait::async_trait]
impl HttpTransport for CurlTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportFault> {
        debug!("curl transport: {} {}", request.method, request.url);

        let output_file = NamedTempFile::new()
            .map_err(|e| TransportFault::new(FaultKind::Other, e.to_string()))?;

        let mut cmd = Command::new("curl");
        cmd.args(["-sS", "--connect-timeout", "30", "--max-time", "90"]);
        cmd.args(["-X", request.method.as_str()]);
        cmd.args(["-w", "%{http_code}"]);
        cmd.arg("-o").arg(output_file.path());

        if self.tls == TlsVerification::Insecure {
            cmd.arg("-k");
        }

        for (name, value) in &request.headers {
            cmd.args(["-H", &format!("{name}: {value}")]);
        }

        // Body goes through a temp file; chunk payloads are binary and can
        // exceed the argv limit.
        let body_file = match &request.body {
            Some(body) => {
                let file = NamedTempFile::new()
                    .map_err(|e| TransportFault::new(FaultKind::Other, e.to_string()))?;
                std::fs::write(file.path(), body)
                    .map_err(|e| TransportFault::new(FaultKind::Other, e.to_string()))?;
                cmd.arg("--data-binary")
                    .arg(format!("@{}", file.path().display()));
                Some(file)
            }
            None => None,
        };

        cmd.arg(&request.url);

        let output = cmd
            .output()
            .await
            .map_err(|e| TransportFault::new(FaultKind::Other, format!("curl failed: {e}")))?;

        drop(body_file);

        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let kind = self.classify_exit(code, &stderr);
            return Err(TransportFault::new(
                kind,
                format!("curl exited with {code}: {}", stderr.trim()),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let status: u16 = stdout.trim().parse().map_err(|_| {
            TransportFault::new(
                FaultKind::Other,
                format!("curl did not report a status code: {stdout}"),
            )
        })?;

        let body = std::fs::read(output_file.path())
            .map_err(|e| TransportFault::new(FaultKind::Other, e.to_string()))?;

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Method;
    use httpmock::prelude::*;

    #[test]
    fn exit_code_classification() {
        let transport = CurlTransport {
            tls: TlsVerification::Strict,
        };
        assert_eq!(transport.classify_exit(EXIT_DNS, ""), FaultKind::Dns);
        assert_eq!(
            transport.classify_exit(EXIT_CONNECT, ""),
            FaultKind::ConnectionReset
        );
        assert_eq!(transport.classify_exit(EXIT_TIMEOUT, ""), FaultKind::Timeout);
        assert_eq!(
            transport.classify_exit(EXIT_CERT_VERIFY, "certificate verify failed"),
            FaultKind::Tls
        );
        assert_eq!(transport.classify_exit(2, "usage"), FaultKind::Other);
    }

    #[test]
    fn crl_outage_tolerance_applies_to_curl_stderr() {
        let transport = CurlTransport {
            tls: TlsVerification::TolerateCrlOutage,
        };
        assert_eq!(
            transport.classify_exit(
                EXIT_CERT_VERIFY,
                "schannel: CRL distribution point download failed"
            ),
            FaultKind::CrlUnavailable
        );
        assert_eq!(
            transport.classify_exit(EXIT_CERT_VERIFY, "certificate revoked"),
            FaultKind::Other
        );
    }

    #[tokio::test]
    async fn round_trips_through_real_curl() {
        if !CurlTransport::is_curl_available() {
            return;
        }

        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/echo").body("payload");
                then.status(201).body("created");
            })
            .await;

        let transport = CurlTransport::new(TlsVerification::Strict).unwrap();
        let request = HttpRequest::new(Method::Post, server.url("/v1/echo"))
            .header("Content-Type", "application/json")
            .body(b"payload".to_vec());
        let response = transport.execute(request).await.unwrap();

        assert_eq!(response.status, 201);
        assert_eq!(response.body, b"created");
    }
}
