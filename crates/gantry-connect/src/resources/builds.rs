//! Build listing and management

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::client::ConnectClient;
use crate::error::Result;
use crate::jsonapi::{Document, DocumentList};

/// Build information
#[derive(Debug, Clone)]
pub struct Build {
    pub id: String,
    /// Build number (CFBundleVersion)
    pub version: String,
    pub uploaded_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub expired: bool,
    pub processing_state: BuildProcessingState,
    pub uses_non_exempt_encryption: Option<bool>,
}

/// Build processing state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildProcessingState {
    Processing,
    Failed,
    Invalid,
    Valid,
}

impl BuildProcessingState {
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "FAILED" => Self::Failed,
            "INVALID" => Self::Invalid,
            "VALID" => Self::Valid,
            _ => Self::Processing,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuildAttributes {
    #[serde(default)]
    version: String,
    #[serde(default)]
    uploaded_date: Option<String>,
    #[serde(default)]
    expiration_date: Option<String>,
    #[serde(default)]
    expired: bool,
    #[serde(default)]
    processing_state: String,
    #[serde(default)]
    uses_non_exempt_encryption: Option<bool>,
}

impl ConnectClient {
    /// List builds for an app, newest first.
    pub async fn list_builds(&self, app_id: &str, limit: Option<usize>) -> Result<Vec<Build>> {
        let limit = limit.unwrap_or(25);
        let endpoint =
            format!("/builds?filter[app]={app_id}&limit={limit}&sort=-uploadedDate");
        let document: DocumentList<BuildAttributes> = self.get(&endpoint).await?;
        Ok(document.data.into_iter().map(flatten).collect())
    }

    /// Get one build by id.
    pub async fn get_build(&self, build_id: &str) -> Result<Build> {
        let document: Document<BuildAttributes> =
            self.get(&format!("/builds/{build_id}")).await?;
        Ok(flatten(document.data))
    }

    /// Expire a build, removing it from TestFlight.
    pub async fn expire_build(&self, build_id: &str) -> Result<()> {
        let body = serde_json::json!({
            "data": {
                "type": "builds",
                "id": build_id,
                "attributes": { "expired": true }
            }
        });
        self.patch_no_content(&format!("/builds/{build_id}"), body)
            .await
    }

    /// Set the export compliance flag on a build.
    pub async fn set_export_compliance(
        &self,
        build_id: &str,
        uses_encryption: bool,
    ) -> Result<()> {
        let body = serde_json::json!({
            "data": {
                "type": "builds",
                "id": build_id,
                "attributes": { "usesNonExemptEncryption": uses_encryption }
            }
        });
        self.patch_no_content(&format!("/builds/{build_id}"), body)
            .await
    }
}

fn flatten(resource: crate::jsonapi::Resource<BuildAttributes>) -> Build {
    let a = resource.attributes;
    Build {
        id: resource.id,
        version: a.version,
        uploaded_at: parse_date(a.uploaded_date),
        expires_at: parse_date(a.expiration_date),
        expired: a.expired,
        processing_state: BuildProcessingState::from_str(&a.processing_state),
        uses_non_exempt_encryption: a.uses_non_exempt_encryption,
    }
}

fn parse_date(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|d| d.with_timezone(&Utc))
}
