//! App Store versions, review submission, phased release

use serde::Deserialize;

use crate::client::ConnectClient;
use crate::error::Result;
use crate::jsonapi::{Document, DocumentList};

/// An App Store version (one platform's release train entry)
#[derive(Debug, Clone)]
pub struct AppStoreVersion {
    pub id: String,
    pub version_string: String,
    pub platform: String,
    pub state: String,
}

/// Phased release state, relayed as the platform reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhasedReleaseState {
    Inactive,
    Active,
    Paused,
    Complete,
}

impl PhasedReleaseState {
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Self::Active,
            "PAUSED" => Self::Paused,
            "COMPLETE" => Self::Complete,
            _ => Self::Inactive,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "INACTIVE",
            Self::Active => "ACTIVE",
            Self::Paused => "PAUSED",
            Self::Complete => "COMPLETE",
        }
    }
}

/// Gradual rollout state of a released version
#[derive(Debug, Clone)]
pub struct PhasedRelease {
    pub id: String,
    pub state: PhasedReleaseState,
    /// 1-7 while active
    pub current_day_number: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionAttributes {
    #[serde(default)]
    version_string: String,
    #[serde(default)]
    platform: String,
    #[serde(default)]
    app_store_state: Option<String>,
    #[serde(default)]
    app_version_state: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PhasedReleaseAttributes {
    #[serde(default)]
    phased_release_state: String,
    #[serde(default)]
    current_day_number: Option<u32>,
}

impl ConnectClient {
    /// List App Store versions for an app.
    pub async fn list_versions(&self, app_id: &str) -> Result<Vec<AppStoreVersion>> {
        let endpoint = format!("/apps/{app_id}/appStoreVersions");
        let document: DocumentList<VersionAttributes> = self.get(&endpoint).await?;
        Ok(document.data.into_iter().map(flatten).collect())
    }

    /// Create a new App Store version for an app.
    pub async fn create_version(
        &self,
        app_id: &str,
        platform: &str,
        version_string: &str,
    ) -> Result<AppStoreVersion> {
        let body = serde_json::json!({
            "data": {
                "type": "appStoreVersions",
                "attributes": {
                    "platform": platform,
                    "versionString": version_string
                },
                "relationships": {
                    "app": { "data": { "type": "apps", "id": app_id } }
                }
            }
        });

        let document: Document<VersionAttributes> =
            self.post("/appStoreVersions", body).await?;
        Ok(flatten(document.data))
    }

    /// Update a version's string and/or copyright line.
    pub async fn update_version(
        &self,
        version_id: &str,
        version_string: Option<&str>,
        copyright: Option<&str>,
    ) -> Result<()> {
        let mut attributes = serde_json::Map::new();
        if let Some(v) = version_string {
            attributes.insert("versionString".to_string(), serde_json::json!(v));
        }
        if let Some(c) = copyright {
            attributes.insert("copyright".to_string(), serde_json::json!(c));
        }

        let body = serde_json::json!({
            "data": {
                "type": "appStoreVersions",
                "id": version_id,
                "attributes": attributes
            }
        });
        self.patch_no_content(&format!("/appStoreVersions/{version_id}"), body)
            .await
    }

    /// Attach a build to a version ahead of submission.
    pub async fn set_version_build(&self, version_id: &str, build_id: &str) -> Result<()> {
        let body = serde_json::json!({
            "data": { "type": "builds", "id": build_id }
        });
        self.patch_no_content(
            &format!("/appStoreVersions/{version_id}/relationships/build"),
            body,
        )
        .await
    }

    /// Submit a version for App Review.
    pub async fn submit_version_for_review(&self, version_id: &str) -> Result<()> {
        let body = serde_json::json!({
            "data": {
                "type": "appStoreVersionSubmissions",
                "relationships": {
                    "appStoreVersion": {
                        "data": { "type": "appStoreVersions", "id": version_id }
                    }
                }
            }
        });
        self.post_no_content("/appStoreVersionSubmissions", body)
            .await
    }

    /// Enable phased release on a version.
    pub async fn create_phased_release(
        &self,
        version_id: &str,
        state: PhasedReleaseState,
    ) -> Result<PhasedRelease> {
        let body = serde_json::json!({
            "data": {
                "type": "appStoreVersionPhasedReleases",
                "attributes": { "phasedReleaseState": state.as_str() },
                "relationships": {
                    "appStoreVersion": {
                        "data": { "type": "appStoreVersions", "id": version_id }
                    }
                }
            }
        });

        let document: Document<PhasedReleaseAttributes> = self
            .post("/appStoreVersionPhasedReleases", body)
            .await?;
        Ok(flatten_phased(document.data))
    }

    /// Phased release state of a version; a version without one is an
    /// explicit absent outcome.
    pub async fn find_phased_release(&self, version_id: &str) -> Result<Option<PhasedRelease>> {
        let endpoint = format!("/appStoreVersions/{version_id}/appStoreVersionPhasedRelease");
        let result = self.get::<Document<PhasedReleaseAttributes>>(&endpoint).await;
        Ok(Self::optional(result)?.map(|d| flatten_phased(d.data)))
    }

    /// Pause, resume, or complete a phased release.
    pub async fn update_phased_release(
        &self,
        phased_release_id: &str,
        state: PhasedReleaseState,
    ) -> Result<()> {
        let body = serde_json::json!({
            "data": {
                "type": "appStoreVersionPhasedReleases",
                "id": phased_release_id,
                "attributes": { "phasedReleaseState": state.as_str() }
            }
        });
        self.patch_no_content(
            &format!("/appStoreVersionPhasedReleases/{phased_release_id}"),
            body,
        )
        .await
    }
}

fn flatten(resource: crate::jsonapi::Resource<VersionAttributes>) -> AppStoreVersion {
    let a = resource.attributes;
    AppStoreVersion {
        id: resource.id,
        version_string: a.version_string,
        platform: a.platform,
        // Newer API revisions renamed appStoreState; accept either.
        state: a
            .app_version_state
            .or(a.app_store_state)
            .unwrap_or_default(),
    }
}

fn flatten_phased(resource: crate::jsonapi::Resource<PhasedReleaseAttributes>) -> PhasedRelease {
    PhasedRelease {
        id: resource.id,
        state: PhasedReleaseState::from_str(&resource.attributes.phased_release_state),
        current_day_number: resource.attributes.current_day_number,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::scripted_client;

    #[test]
    fn phased_release_state_round_trips() {
        for state in [
            PhasedReleaseState::Inactive,
            PhasedReleaseState::Active,
            PhasedReleaseState::Paused,
            PhasedReleaseState::Complete,
        ] {
            assert_eq!(PhasedReleaseState::from_str(state.as_str()), state);
        }
    }

    #[tokio::test]
    async fn version_state_accepts_old_and_new_field_names() {
        let client = scripted_client(vec![(
            200,
            r#"{"data": [
                {"type": "appStoreVersions", "id": "v1",
                 "attributes": {"versionString": "1.0", "platform": "IOS", "appStoreState": "READY_FOR_SALE"}},
                {"type": "appStoreVersions", "id": "v2",
                 "attributes": {"versionString": "1.1", "platform": "IOS", "appVersionState": "PREPARE_FOR_SUBMISSION"}}
            ]}"#,
        )]);

        let versions = client.list_versions("123").await.unwrap();
        assert_eq!(versions[0].state, "READY_FOR_SALE");
        assert_eq!(versions[1].state, "PREPARE_FOR_SUBMISSION");
    }

    #[tokio::test]
    async fn absent_phased_release_is_not_an_error() {
        let client = scripted_client(vec![(
            404,
            r#"{"errors": [{"status": "404", "title": "Not found"}]}"#,
        )]);
        let phased = client.find_phased_release("v1").await.unwrap();
        assert!(phased.is_none());
    }
}
