//! Asset delivery lifecycle
//!
//! Screenshots, previews, and subscription images all move through the same
//! states: RESERVED → parts uploaded → COMMITTED → PROCESSING →
//! COMPLETE | FAILED. Reservation is endpoint-specific and lives in the
//! resource modules; the commit and the caller-driven status poll are
//! shared here.

use std::time::Duration;

use md5::{Digest, Md5};
use serde::Deserialize;
use tracing::{debug, info};

use crate::client::ConnectClient;
use crate::error::{ConnectError, Result};
use crate::jsonapi::Document;
use crate::upload::{upload_parts, UploadOperation};

/// Delivery state of a reserved asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetDeliveryState {
    AwaitingUpload,
    UploadComplete,
    Processing,
    Complete,
    Failed,
}

impl AssetDeliveryState {
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "AWAITING_UPLOAD" => Self::AwaitingUpload,
            "UPLOAD_COMPLETE" => Self::UploadComplete,
            "COMPLETE" => Self::Complete,
            "FAILED" => Self::Failed,
            _ => Self::Processing,
        }
    }

    /// Whether the server will not move the asset any further.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

/// A reserved asset: server-assigned id plus the upload operations sized to
/// the file.
#[derive(Debug, Clone)]
pub struct ReservedAsset {
    pub id: String,
    pub operations: Vec<UploadOperation>,
}

/// MD5 checksum in the hex form the commit endpoint expects.
pub fn source_file_checksum(file: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(file);
    format!("{:x}", hasher.finalize())
}

/// Attribute envelope carried by every asset resource.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AssetAttributes {
    #[serde(default)]
    pub asset_delivery_state: Option<DeliveryStateAttributes>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeliveryStateAttributes {
    #[serde(default)]
    pub state: Option<String>,
}

/// Poll `probe` at `interval` until it reports a terminal state or
/// `timeout` elapses. The wait is a plain sleep; cancellation mid-poll is
/// not supported.
pub async fn poll_until_terminal<F, Fut>(
    mut probe: F,
    interval: Duration,
    timeout: Duration,
) -> Result<AssetDeliveryState>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<AssetDeliveryState>>,
{
    let start = tokio::time::Instant::now();

    loop {
        let state = probe().await?;
        if state.is_terminal() {
            return Ok(state);
        }
        debug!(?state, "asset still processing");

        if start.elapsed() + interval > timeout {
            return Err(ConnectError::Timeout(format!(
                "asset not processed within {}s",
                timeout.as_secs()
            )));
        }
        tokio::time::sleep(interval).await;
    }
}

impl ConnectClient {
    /// Upload every reserved part of `file`, sequentially.
    pub async fn upload_asset(&self, asset: &ReservedAsset, file: &[u8]) -> Result<()> {
        upload_parts(
            self.transport(),
            &self.config().retry,
            &asset.operations,
            file,
        )
        .await
    }

    /// Mark an asset uploaded and hand the server the checksum to verify
    /// against. `collection` is both the resource type and the path
    /// segment, e.g. `appScreenshots`.
    pub async fn commit_asset(&self, collection: &str, asset_id: &str, file: &[u8]) -> Result<()> {
        let body = serde_json::json!({
            "data": {
                "type": collection,
                "id": asset_id,
                "attributes": {
                    "uploaded": true,
                    "sourceFileChecksum": source_file_checksum(file)
                }
            }
        });

        let endpoint = format!("/{collection}/{asset_id}");
        self.patch_no_content(&endpoint, body).await?;
        info!(asset_id, "asset committed");
        Ok(())
    }

    /// Current delivery state of an asset.
    pub async fn asset_delivery_state(
        &self,
        collection: &str,
        asset_id: &str,
    ) -> Result<AssetDeliveryState> {
        let endpoint = format!("/{collection}/{asset_id}");
        let document: Document<AssetAttributes> = self.get(&endpoint).await?;
        let state = document
            .data
            .attributes
            .asset_delivery_state
            .and_then(|s| s.state)
            .map(|s| AssetDeliveryState::from_str(&s))
            .unwrap_or(AssetDeliveryState::Processing);
        Ok(state)
    }

    /// Poll the asset's delivery state until COMPLETE or FAILED, or until
    /// `timeout` elapses. Caller-driven; nothing polls in the background.
    pub async fn wait_for_asset(
        &self,
        collection: &str,
        asset_id: &str,
        interval: Duration,
        timeout: Duration,
    ) -> Result<AssetDeliveryState> {
        poll_until_terminal(
            || self.asset_delivery_state(collection, asset_id),
            interval,
            timeout,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn delivery_state_parsing() {
        assert_eq!(
            AssetDeliveryState::from_str("AWAITING_UPLOAD"),
            AssetDeliveryState::AwaitingUpload
        );
        assert_eq!(
            AssetDeliveryState::from_str("complete"),
            AssetDeliveryState::Complete
        );
        assert_eq!(
            AssetDeliveryState::from_str("FAILED"),
            AssetDeliveryState::Failed
        );
        assert_eq!(
            AssetDeliveryState::from_str("SOMETHING_NEW"),
            AssetDeliveryState::Processing
        );
    }

    #[test]
    fn terminal_states() {
        assert!(AssetDeliveryState::Complete.is_terminal());
        assert!(AssetDeliveryState::Failed.is_terminal());
        assert!(!AssetDeliveryState::Processing.is_terminal());
        assert!(!AssetDeliveryState::AwaitingUpload.is_terminal());
    }

    #[test]
    fn checksum_matches_known_md5() {
        // md5("hello") from RFC 1321 reference output
        assert_eq!(
            source_file_checksum(b"hello"),
            "5d41402abc4b2a76b9719d911017c592"
        );
    }

    fn scripted_probe(
        states: Vec<AssetDeliveryState>,
    ) -> impl FnMut() -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<AssetDeliveryState>> + Send>,
    > {
        let states = std::sync::Arc::new(Mutex::new(states));
        move || {
            let states = states.clone();
            Box::pin(async move {
                let mut states = states.lock().unwrap();
                if states.is_empty() {
                    Ok(AssetDeliveryState::Processing)
                } else {
                    Ok(states.remove(0))
                }
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn poll_terminates_on_the_terminal_probe() {
        let probe = scripted_probe(vec![
            AssetDeliveryState::Processing,
            AssetDeliveryState::Processing,
            AssetDeliveryState::Complete,
        ]);

        let state = poll_until_terminal(probe, Duration::from_secs(5), Duration::from_secs(600))
            .await
            .unwrap();
        assert_eq!(state, AssetDeliveryState::Complete);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_reports_failed_assets() {
        let probe = scripted_probe(vec![
            AssetDeliveryState::UploadComplete,
            AssetDeliveryState::Failed,
        ]);

        let state = poll_until_terminal(probe, Duration::from_secs(5), Duration::from_secs(600))
            .await
            .unwrap();
        assert_eq!(state, AssetDeliveryState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_times_out_instead_of_spinning_forever() {
        let probe = scripted_probe(Vec::new());

        let error = poll_until_terminal(probe, Duration::from_secs(5), Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(error, ConnectError::Timeout(_)));
    }
}
