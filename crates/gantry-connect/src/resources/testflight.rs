//! TestFlight beta groups, testers, and review submissions

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::client::ConnectClient;
use crate::error::Result;
use crate::jsonapi::{Document, DocumentList};

/// Beta group
#[derive(Debug, Clone)]
pub struct BetaGroup {
    pub id: String,
    pub name: String,
    pub is_internal: bool,
    pub public_link: Option<String>,
}

/// Beta tester
#[derive(Debug, Clone)]
pub struct BetaTester {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Beta review state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BetaReviewState {
    WaitingForReview,
    InReview,
    Rejected,
    Approved,
}

impl BetaReviewState {
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "IN_REVIEW" => Self::InReview,
            "REJECTED" => Self::Rejected,
            "APPROVED" => Self::Approved,
            _ => Self::WaitingForReview,
        }
    }
}

/// A build's beta review submission
#[derive(Debug, Clone)]
pub struct BetaReviewSubmission {
    pub id: String,
    pub state: BetaReviewState,
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupAttributes {
    #[serde(default)]
    name: String,
    #[serde(default)]
    is_internal_group: bool,
    #[serde(default)]
    public_link: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TesterAttributes {
    #[serde(default)]
    email: String,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmissionAttributes {
    #[serde(default)]
    beta_review_state: String,
    #[serde(default)]
    submitted_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalizationAttributes {
    #[serde(default)]
    locale: String,
}

impl ConnectClient {
    /// List beta groups for an app.
    pub async fn list_beta_groups(&self, app_id: &str) -> Result<Vec<BetaGroup>> {
        let endpoint = format!("/betaGroups?filter[app]={app_id}");
        let document: DocumentList<GroupAttributes> = self.get(&endpoint).await?;
        Ok(document.data.into_iter().map(flatten_group).collect())
    }

    /// Create a beta group.
    pub async fn create_beta_group(
        &self,
        app_id: &str,
        name: &str,
        is_internal: bool,
    ) -> Result<BetaGroup> {
        let body = serde_json::json!({
            "data": {
                "type": "betaGroups",
                "attributes": { "name": name, "isInternalGroup": is_internal },
                "relationships": {
                    "app": { "data": { "type": "apps", "id": app_id } }
                }
            }
        });

        let document: Document<GroupAttributes> = self.post("/betaGroups", body).await?;
        Ok(flatten_group(document.data))
    }

    /// Delete a beta group.
    pub async fn delete_beta_group(&self, group_id: &str) -> Result<()> {
        self.delete(&format!("/betaGroups/{group_id}"), None).await
    }

    /// Add builds to a beta group.
    pub async fn add_builds_to_group(&self, group_id: &str, build_ids: &[&str]) -> Result<()> {
        let body = relationship_list("builds", build_ids);
        self.post_no_content(&format!("/betaGroups/{group_id}/relationships/builds"), body)
            .await
    }

    /// Remove builds from a beta group.
    pub async fn remove_builds_from_group(
        &self,
        group_id: &str,
        build_ids: &[&str],
    ) -> Result<()> {
        let body = relationship_list("builds", build_ids);
        self.delete(
            &format!("/betaGroups/{group_id}/relationships/builds"),
            Some(body),
        )
        .await
    }

    /// List beta testers, optionally restricted to one group.
    pub async fn list_beta_testers(
        &self,
        app_id: &str,
        group_id: Option<&str>,
    ) -> Result<Vec<BetaTester>> {
        let endpoint = match group_id {
            Some(gid) => format!("/betaTesters?filter[betaGroups]={gid}"),
            None => format!("/betaTesters?filter[apps]={app_id}"),
        };
        let resources = self.get_all::<TesterAttributes>(&endpoint).await?;
        Ok(resources.into_iter().map(flatten_tester).collect())
    }

    /// Invite a tester into one or more groups.
    #[instrument(skip(self, first_name, last_name, group_ids))]
    pub async fn invite_beta_tester(
        &self,
        email: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
        group_ids: &[&str],
    ) -> Result<BetaTester> {
        let mut attributes = serde_json::json!({ "email": email });
        if let Some(name) = first_name {
            attributes["firstName"] = serde_json::json!(name);
        }
        if let Some(name) = last_name {
            attributes["lastName"] = serde_json::json!(name);
        }

        let body = serde_json::json!({
            "data": {
                "type": "betaTesters",
                "attributes": attributes,
                "relationships": {
                    "betaGroups": { "data": ref_list("betaGroups", group_ids) }
                }
            }
        });

        let document: Document<TesterAttributes> = self.post("/betaTesters", body).await?;
        info!(email, "invited beta tester");
        Ok(flatten_tester(document.data))
    }

    /// Remove a tester entirely.
    pub async fn remove_beta_tester(&self, tester_id: &str) -> Result<()> {
        self.delete(&format!("/betaTesters/{tester_id}"), None).await
    }

    /// Submit a build for external beta review.
    pub async fn submit_for_beta_review(&self, build_id: &str) -> Result<BetaReviewSubmission> {
        let body = serde_json::json!({
            "data": {
                "type": "betaAppReviewSubmissions",
                "relationships": {
                    "build": { "data": { "type": "builds", "id": build_id } }
                }
            }
        });

        let document: Document<SubmissionAttributes> =
            self.post("/betaAppReviewSubmissions", body).await?;
        Ok(flatten_submission(document.data))
    }

    /// Status of a beta review submission.
    pub async fn get_beta_review_status(
        &self,
        submission_id: &str,
    ) -> Result<BetaReviewSubmission> {
        let document: Document<SubmissionAttributes> = self
            .get(&format!("/betaAppReviewSubmissions/{submission_id}"))
            .await?;
        Ok(flatten_submission(document.data))
    }

    /// Set the "What's New" text for a build in one locale, creating the
    /// localization when it does not exist yet.
    pub async fn set_whats_new(
        &self,
        build_id: &str,
        locale: &str,
        whats_new: &str,
    ) -> Result<()> {
        let endpoint = format!("/builds/{build_id}/betaBuildLocalizations");
        let existing: DocumentList<LocalizationAttributes> = self.get(&endpoint).await?;

        match existing.data.iter().find(|l| l.attributes.locale == locale) {
            Some(localization) => {
                let body = serde_json::json!({
                    "data": {
                        "type": "betaBuildLocalizations",
                        "id": localization.id,
                        "attributes": { "whatsNew": whats_new }
                    }
                });
                self.patch_no_content(
                    &format!("/betaBuildLocalizations/{}", localization.id),
                    body,
                )
                .await?;
            }
            None => {
                let body = serde_json::json!({
                    "data": {
                        "type": "betaBuildLocalizations",
                        "attributes": { "locale": locale, "whatsNew": whats_new },
                        "relationships": {
                            "build": { "data": { "type": "builds", "id": build_id } }
                        }
                    }
                });
                self.post_no_content("/betaBuildLocalizations", body).await?;
            }
        }

        info!(build_id, locale, "set what's new text");
        Ok(())
    }
}

fn ref_list(kind: &str, ids: &[&str]) -> serde_json::Value {
    serde_json::Value::Array(
        ids.iter()
            .map(|id| serde_json::json!({ "type": kind, "id": id }))
            .collect(),
    )
}

fn relationship_list(kind: &str, ids: &[&str]) -> serde_json::Value {
    serde_json::json!({ "data": ref_list(kind, ids) })
}

fn flatten_group(resource: crate::jsonapi::Resource<GroupAttributes>) -> BetaGroup {
    BetaGroup {
        id: resource.id,
        name: resource.attributes.name,
        is_internal: resource.attributes.is_internal_group,
        public_link: resource.attributes.public_link,
    }
}

fn flatten_tester(resource: crate::jsonapi::Resource<TesterAttributes>) -> BetaTester {
    BetaTester {
        id: resource.id,
        email: resource.attributes.email,
        first_name: resource.attributes.first_name,
        last_name: resource.attributes.last_name,
    }
}

fn flatten_submission(
    resource: crate::jsonapi::Resource<SubmissionAttributes>,
) -> BetaReviewSubmission {
    BetaReviewSubmission {
        id: resource.id,
        state: BetaReviewState::from_str(&resource.attributes.beta_review_state),
        submitted_at: resource
            .attributes
            .submitted_date
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|d| d.with_timezone(&Utc)),
    }
}
