//! Chunked uploads to pre-signed URLs
//!
//! A reservation hands back one or more upload operations, each a PUT of a
//! contiguous byte range to a pre-signed URL with server-specified headers.
//! Operations run sequentially through the retry loop; the reservation
//! headers carry the authorization, so no bearer token is attached.

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::RetryPolicy;
use crate::error::{ConnectError, Result};
use crate::retry::send_with_retry;
use crate::transport::{HttpRequest, HttpTransport, Method};

/// One part of a reserved upload: destination, byte range, headers.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOperation {
    pub method: Option<String>,
    pub url: String,
    pub offset: u64,
    pub length: u64,
    #[serde(default)]
    pub request_headers: Vec<UploadHeader>,
}

/// A header name/value pair supplied by the reservation.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadHeader {
    pub name: String,
    pub value: String,
}

impl UploadOperation {
    /// The exact byte range this operation covers, bounds-checked against
    /// the file.
    pub fn slice<'a>(&self, file: &'a [u8]) -> Result<&'a [u8]> {
        let start = usize::try_from(self.offset)
            .map_err(|_| ConnectError::UploadFailed("chunk offset overflows".to_string()))?;
        let end = start
            .checked_add(usize::try_from(self.length).map_err(|_| {
                ConnectError::UploadFailed("chunk length overflows".to_string())
            })?)
            .ok_or_else(|| ConnectError::UploadFailed("chunk range overflows".to_string()))?;

        file.get(start..end).ok_or_else(|| {
            ConnectError::UploadFailed(format!(
                "chunk {}..{} exceeds file of {} bytes",
                start,
                end,
                file.len()
            ))
        })
    }
}

/// PUT one chunk to its pre-signed URL, retrying per `policy`.
pub async fn put_chunk(
    transport: &dyn HttpTransport,
    policy: &RetryPolicy,
    operation: &UploadOperation,
    chunk: &[u8],
) -> Result<()> {
    debug!(
        url = %operation.url,
        offset = operation.offset,
        length = operation.length,
        "uploading chunk"
    );

    let mut request = HttpRequest::new(Method::Put, operation.url.clone()).body(chunk.to_vec());
    for header in &operation.request_headers {
        request = request.header(header.name.clone(), header.value.clone());
    }

    send_with_retry(transport, policy, &request).await?;
    Ok(())
}

/// Run every operation of a reservation sequentially against `file`.
#[instrument(skip_all, fields(parts = operations.len(), bytes = file.len()))]
pub async fn upload_parts(
    transport: &dyn HttpTransport,
    policy: &RetryPolicy,
    operations: &[UploadOperation],
    file: &[u8],
) -> Result<()> {
    for operation in operations {
        let chunk = operation.slice(file)?;
        put_chunk(transport, policy, operation, chunk).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::ScriptedTransport;
    use crate::transport::{FaultKind, HttpResponse, TransportFault};
    use std::time::Duration;

    fn operation(url: &str, offset: u64, length: u64) -> UploadOperation {
        UploadOperation {
            method: Some("PUT".to_string()),
            url: url.to_string(),
            offset,
            length,
            request_headers: vec![UploadHeader {
                name: "Content-Type".to_string(),
                value: "image/png".to_string(),
            }],
        }
    }

    fn ok() -> std::result::Result<HttpResponse, TransportFault> {
        Ok(HttpResponse {
            status: 200,
            body: Vec::new(),
        })
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(10))
    }

    #[test]
    fn deserializes_reservation_operations() {
        let body = r#"{
            "method": "PUT",
            "url": "https://store-upload.example/abc",
            "offset": 0,
            "length": 1048576,
            "requestHeaders": [{"name": "Content-Type", "value": "image/png"}]
        }"#;

        let op: UploadOperation = serde_json::from_str(body).unwrap();
        assert_eq!(op.length, 1048576);
        assert_eq!(op.request_headers[0].name, "Content-Type");
    }

    #[test]
    fn slice_is_exact_and_bounds_checked() {
        let file: Vec<u8> = (0..100u8).collect();

        assert_eq!(operation("u", 0, 10).slice(&file).unwrap(), &file[0..10]);
        assert_eq!(operation("u", 90, 10).slice(&file).unwrap(), &file[90..100]);
        assert!(operation("u", 90, 11).slice(&file).is_err());
        assert!(operation("u", 200, 1).slice(&file).is_err());
    }

    #[tokio::test]
    async fn put_carries_reservation_headers_and_body() {
        let transport = ScriptedTransport::new(vec![ok()]);
        let op = operation("https://store-upload.example/abc", 0, 5);

        put_chunk(&transport, &policy(), &op, b"bytes").await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::Put);
        assert_eq!(requests[0].body.as_deref(), Some(b"bytes".as_slice()));
        assert_eq!(
            requests[0].headers.get("Content-Type").map(String::as_str),
            Some("image/png")
        );
        // Pre-signed URLs embed their own authorization.
        assert!(!requests[0].headers.contains_key("Authorization"));
    }

    #[tokio::test]
    async fn parts_concatenate_to_the_original_file() {
        let file: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let operations = vec![
            operation("https://u/1", 0, 400),
            operation("https://u/2", 400, 400),
            operation("https://u/3", 800, 200),
        ];
        let transport = ScriptedTransport::new(vec![ok(), ok(), ok()]);

        upload_parts(&transport, &policy(), &operations, &file)
            .await
            .unwrap();

        let requests = transport.requests();
        let mut reassembled = Vec::new();
        for request in &requests {
            reassembled.extend_from_slice(request.body.as_deref().unwrap());
        }
        assert_eq!(reassembled, file);
        // In order, not just complete.
        assert_eq!(requests[0].url, "https://u/1");
        assert_eq!(requests[2].url, "https://u/3");
    }

    #[tokio::test(start_paused = true)]
    async fn chunk_upload_retries_transient_faults() {
        let transport = ScriptedTransport::new(vec![
            Err(TransportFault::new(FaultKind::Tls, "handshake interrupted")),
            Err(TransportFault::new(FaultKind::ConnectionReset, "reset")),
            ok(),
        ]);
        let op = operation("https://u/1", 0, 4);

        put_chunk(&transport, &policy(), &op, b"data").await.unwrap();
        assert_eq!(transport.attempts(), 3);
    }

    #[tokio::test]
    async fn failed_part_stops_the_sequence() {
        let file = vec![0u8; 20];
        let operations = vec![operation("https://u/1", 0, 10), operation("https://u/2", 10, 10)];
        let transport = ScriptedTransport::new(vec![Ok(HttpResponse {
            status: 403,
            body: Vec::new(),
        })]);

        let error = upload_parts(&transport, &RetryPolicy::default(), &operations, &file)
            .await
            .unwrap_err();
        assert_eq!(error.status(), Some(403));
        assert_eq!(transport.attempts(), 1);
    }
}
