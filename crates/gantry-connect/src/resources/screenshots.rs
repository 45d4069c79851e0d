//! Screenshot sets and screenshot asset delivery
//!
//! Screenshots are the primary users of the reserve → upload → commit →
//! poll flow in [`crate::assets`].

use serde::Deserialize;
use tracing::{info, instrument};

use crate::assets::{AssetDeliveryState, ReservedAsset};
use crate::client::ConnectClient;
use crate::error::{ConnectError, Result};
use crate::jsonapi::{Document, DocumentList};
use crate::upload::UploadOperation;

/// A version's localization (locale container for screenshot sets)
#[derive(Debug, Clone)]
pub struct VersionLocalization {
    pub id: String,
    pub locale: String,
}

/// A screenshot set: one display type within one localization
#[derive(Debug, Clone)]
pub struct ScreenshotSet {
    pub id: String,
    pub display_type: String,
}

/// A screenshot within a set
#[derive(Debug, Clone)]
pub struct Screenshot {
    pub id: String,
    pub file_name: String,
    pub state: AssetDeliveryState,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalizationAttributes {
    #[serde(default)]
    locale: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetAttributes {
    #[serde(default)]
    screenshot_display_type: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScreenshotAttributes {
    #[serde(default)]
    file_name: String,
    #[serde(default)]
    upload_operations: Option<Vec<UploadOperation>>,
    #[serde(default)]
    asset_delivery_state: Option<DeliveryState>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeliveryState {
    #[serde(default)]
    state: Option<String>,
}

impl ConnectClient {
    /// List a version's localizations.
    pub async fn list_version_localizations(
        &self,
        version_id: &str,
    ) -> Result<Vec<VersionLocalization>> {
        let endpoint = format!("/appStoreVersions/{version_id}/appStoreVersionLocalizations");
        let document: DocumentList<LocalizationAttributes> = self.get(&endpoint).await?;
        Ok(document
            .data
            .into_iter()
            .map(|r| VersionLocalization {
                id: r.id,
                locale: r.attributes.locale,
            })
            .collect())
    }

    /// List screenshot sets under a localization.
    pub async fn list_screenshot_sets(
        &self,
        localization_id: &str,
    ) -> Result<Vec<ScreenshotSet>> {
        let endpoint =
            format!("/appStoreVersionLocalizations/{localization_id}/appScreenshotSets");
        let document: DocumentList<SetAttributes> = self.get(&endpoint).await?;
        Ok(document
            .data
            .into_iter()
            .map(|r| ScreenshotSet {
                id: r.id,
                display_type: r.attributes.screenshot_display_type,
            })
            .collect())
    }

    /// Create a screenshot set for a display type.
    pub async fn create_screenshot_set(
        &self,
        localization_id: &str,
        display_type: &str,
    ) -> Result<ScreenshotSet> {
        let body = serde_json::json!({
            "data": {
                "type": "appScreenshotSets",
                "attributes": { "screenshotDisplayType": display_type },
                "relationships": {
                    "appStoreVersionLocalization": {
                        "data": {
                            "type": "appStoreVersionLocalizations",
                            "id": localization_id
                        }
                    }
                }
            }
        });

        let document: Document<SetAttributes> = self.post("/appScreenshotSets", body).await?;
        Ok(ScreenshotSet {
            id: document.data.id,
            display_type: document.data.attributes.screenshot_display_type,
        })
    }

    /// Delete a screenshot set and everything in it.
    pub async fn delete_screenshot_set(&self, set_id: &str) -> Result<()> {
        self.delete(&format!("/appScreenshotSets/{set_id}"), None)
            .await
    }

    /// List screenshots in a set with their delivery states.
    pub async fn list_screenshots(&self, set_id: &str) -> Result<Vec<Screenshot>> {
        let endpoint = format!("/appScreenshotSets/{set_id}/appScreenshots");
        let document: DocumentList<ScreenshotAttributes> = self.get(&endpoint).await?;
        Ok(document.data.into_iter().map(flatten_screenshot).collect())
    }

    /// Reserve a screenshot slot sized to the file. The response carries
    /// the upload operations for each byte range.
    pub async fn reserve_screenshot(
        &self,
        set_id: &str,
        file_name: &str,
        file_size: u64,
    ) -> Result<ReservedAsset> {
        let body = serde_json::json!({
            "data": {
                "type": "appScreenshots",
                "attributes": { "fileName": file_name, "fileSize": file_size },
                "relationships": {
                    "appScreenshotSet": {
                        "data": { "type": "appScreenshotSets", "id": set_id }
                    }
                }
            }
        });

        let document: Document<ScreenshotAttributes> =
            self.post("/appScreenshots", body).await?;

        let operations = document.data.attributes.upload_operations.ok_or_else(|| {
            ConnectError::UploadFailed("reservation returned no upload operations".to_string())
        })?;

        Ok(ReservedAsset {
            id: document.data.id,
            operations,
        })
    }

    /// Full delivery flow for one screenshot: reserve, upload every part,
    /// commit with the file checksum. Returns the screenshot id; callers
    /// wanting confirmation poll with [`ConnectClient::wait_for_asset`].
    #[instrument(skip(self, file), fields(set_id, file_name, bytes = file.len()))]
    pub async fn upload_screenshot(
        &self,
        set_id: &str,
        file_name: &str,
        file: &[u8],
    ) -> Result<String> {
        let reserved = self
            .reserve_screenshot(set_id, file_name, file.len() as u64)
            .await?;
        info!(
            screenshot_id = %reserved.id,
            parts = reserved.operations.len(),
            "screenshot reserved"
        );

        self.upload_asset(&reserved, file).await?;
        self.commit_asset("appScreenshots", &reserved.id, file)
            .await?;

        Ok(reserved.id)
    }

    /// Delete a screenshot.
    pub async fn delete_screenshot(&self, screenshot_id: &str) -> Result<()> {
        self.delete(&format!("/appScreenshots/{screenshot_id}"), None)
            .await
    }
}

fn flatten_screenshot(resource: crate::jsonapi::Resource<ScreenshotAttributes>) -> Screenshot {
    let state = resource
        .attributes
        .asset_delivery_state
        .and_then(|s| s.state)
        .map(|s| AssetDeliveryState::from_str(&s))
        .unwrap_or(AssetDeliveryState::Processing);
    Screenshot {
        id: resource.id,
        file_name: resource.attributes.file_name,
        state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::scripted_client;

    fn reservation_body() -> String {
        r#"{"data": {
            "type": "appScreenshots", "id": "shot-1",
            "attributes": {
                "fileName": "iphone-home.png",
                "assetDeliveryState": {"state": "AWAITING_UPLOAD"},
                "uploadOperations": [
                    {"method": "PUT", "url": "https://store-upload.example/p1",
                     "offset": 0, "length": 6,
                     "requestHeaders": [{"name": "X-Part", "value": "1"}]},
                    {"method": "PUT", "url": "https://store-upload.example/p2",
                     "offset": 6, "length": 5,
                     "requestHeaders": [{"name": "X-Part", "value": "2"}]}
                ]
            }
        }}"#
        .to_string()
    }

    #[tokio::test]
    async fn reservation_parses_upload_operations() {
        let client = scripted_client(vec![(201, &reservation_body())]);
        let reserved = client
            .reserve_screenshot("set-1", "iphone-home.png", 11)
            .await
            .unwrap();

        assert_eq!(reserved.id, "shot-1");
        assert_eq!(reserved.operations.len(), 2);
        assert_eq!(reserved.operations[1].offset, 6);
    }

    #[tokio::test]
    async fn upload_flow_reserves_puts_and_commits() {
        // reserve, two PUTs, commit
        let client = scripted_client(vec![
            (201, &reservation_body()),
            (200, ""),
            (200, ""),
            (204, ""),
        ]);

        let id = client
            .upload_screenshot("set-1", "iphone-home.png", b"hello world")
            .await
            .unwrap();
        assert_eq!(id, "shot-1");
    }

    #[tokio::test]
    async fn reservation_without_operations_is_an_upload_failure() {
        let client = scripted_client(vec![(
            201,
            r#"{"data": {"type": "appScreenshots", "id": "shot-1",
                 "attributes": {"fileName": "x.png"}}}"#,
        )]);

        let error = client
            .reserve_screenshot("set-1", "x.png", 10)
            .await
            .unwrap_err();
        assert!(matches!(error, ConnectError::UploadFailed(_)));
    }
}
