//! Native HTTP backend built on reqwest

use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use crate::config::TlsVerification;

use super::{
    classify_tls_message, FaultKind, HttpRequest, HttpResponse, HttpTransport, Method,
    TransportFault,
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const READ_TIMEOUT: Duration = Duration::from_secs(60);

/// In-process HTTP backend.
pub struct NativeTransport {
    client: Client,
    tls: TlsVerification,
}

impl NativeTransport {
    pub fn new(tls: TlsVerification) -> Result<Self, TransportFault> {
        let mut builder = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(READ_TIMEOUT);

        if tls == TlsVerification::Insecure {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| TransportFault::new(FaultKind::Other, e.to_string()))?;

        Ok(Self { client, tls })
    }

    fn classify(&self, error: &reqwest::Error) -> FaultKind {
        if error.is_timeout() {
            return FaultKind::Timeout;
        }

        // reqwest flattens hyper/rustls failures into a source chain; walk it
        // for the categories the retry policy distinguishes.
        let mut message = error.to_string();
        let mut source = std::error::Error::source(error);
        while let Some(inner) = source {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            source = inner.source();
        }
        let lower = message.to_lowercase();

        if lower.contains("certificate") || lower.contains("tls") || lower.contains("handshake") {
            return classify_tls_message(&message, self.tls == TlsVerification::TolerateCrlOutage);
        }
        if lower.contains("reset") || lower.contains("broken pipe") || lower.contains("refused") {
            return FaultKind::ConnectionReset;
        }
        if lower.contains("dns") || lower.contains("failed to lookup") {
            return FaultKind::Dns;
        }
        if error.is_connect() {
            return FaultKind::ConnectionReset;
        }
        FaultKind::Other
    }
}

#[async_trait::async_trait]
impl HttpTransport for NativeTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportFault> {
        debug!("native transport: {} {}", request.method, request.url);

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            let kind = self.classify(&e);
            TransportFault::new(kind, e.to_string())
        })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportFault::new(FaultKind::ConnectionReset, e.to_string()))?
            .to_vec();

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn round_trips_status_and_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/apps");
                then.status(200).body(b"{\"data\":[]}");
            })
            .await;

        let transport = NativeTransport::new(TlsVerification::Strict).unwrap();
        let request = HttpRequest::new(Method::Get, server.url("/v1/apps"));
        let response = transport.execute(request).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"{\"data\":[]}");
    }

    #[tokio::test]
    async fn sends_headers_and_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/upload")
                    .header("content-type", "image/png")
                    .body("chunk-bytes");
                then.status(201);
            })
            .await;

        let transport = NativeTransport::new(TlsVerification::Strict).unwrap();
        let request = HttpRequest::new(Method::Put, server.url("/upload"))
            .header("Content-Type", "image/png")
            .body(b"chunk-bytes".to_vec());
        let response = transport.execute(request).await.unwrap();

        assert!(response.is_success());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unreachable_host_is_a_fault() {
        let transport = NativeTransport::new(TlsVerification::Strict).unwrap();
        // Reserved port on localhost; connect fails fast.
        let request = HttpRequest::new(Method::Get, "http://127.0.0.1:1/none");
        let fault = transport.execute(request).await.unwrap_err();
        assert!(fault.is_transient());
    }
}
