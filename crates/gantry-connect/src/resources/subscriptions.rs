//! Subscription groups, subscriptions, and promotional images

use serde::Deserialize;

use crate::assets::{AssetDeliveryState, ReservedAsset};
use crate::client::{try_candidates, Candidate, ConnectClient};
use crate::error::{ConnectError, Result};
use crate::jsonapi::{Document, DocumentList};
use crate::upload::UploadOperation;

/// Subscription group
#[derive(Debug, Clone)]
pub struct SubscriptionGroup {
    pub id: String,
    pub reference_name: String,
}

/// Auto-renewable subscription
#[derive(Debug, Clone)]
pub struct Subscription {
    pub id: String,
    pub name: String,
    pub product_id: String,
    pub state: String,
}

/// Promotional image attached to a subscription
#[derive(Debug, Clone)]
pub struct SubscriptionImage {
    pub id: String,
    pub file_name: String,
    pub state: AssetDeliveryState,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupAttributes {
    #[serde(default)]
    reference_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionAttributes {
    #[serde(default)]
    name: String,
    #[serde(default)]
    product_id: String,
    #[serde(default)]
    state: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageAttributes {
    #[serde(default)]
    file_name: String,
    #[serde(default)]
    upload_operations: Option<Vec<UploadOperation>>,
    #[serde(default)]
    asset_delivery_state: Option<ImageDeliveryState>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageDeliveryState {
    #[serde(default)]
    state: Option<String>,
}

impl ConnectClient {
    /// List subscription groups for an app.
    pub async fn list_subscription_groups(&self, app_id: &str) -> Result<Vec<SubscriptionGroup>> {
        let endpoint = format!("/apps/{app_id}/subscriptionGroups");
        let document: DocumentList<GroupAttributes> = self.get(&endpoint).await?;
        Ok(document
            .data
            .into_iter()
            .map(|r| SubscriptionGroup {
                id: r.id,
                reference_name: r.attributes.reference_name,
            })
            .collect())
    }

    /// List subscriptions within a group.
    pub async fn list_subscriptions(&self, group_id: &str) -> Result<Vec<Subscription>> {
        let endpoint = format!("/subscriptionGroups/{group_id}/subscriptions");
        let document: DocumentList<SubscriptionAttributes> = self.get(&endpoint).await?;
        Ok(document
            .data
            .into_iter()
            .map(|r| Subscription {
                id: r.id,
                name: r.attributes.name,
                product_id: r.attributes.product_id,
                state: r.attributes.state,
            })
            .collect())
    }

    /// Promotional image for a subscription, if one has been delivered.
    ///
    /// The image has moved between two endpoints across API revisions, so
    /// both are tried in order; a subscription with no image at either path
    /// is an explicit absent outcome.
    pub async fn find_subscription_image(
        &self,
        subscription_id: &str,
    ) -> Result<Option<SubscriptionImage>> {
        let primary = format!("/subscriptions/{subscription_id}/images");
        let secondary = format!("/subscriptions/{subscription_id}/subscriptionImages");

        let document = try_candidates(vec![
            Box::pin(self.get::<DocumentList<ImageAttributes>>(&primary))
                as Candidate<'_, DocumentList<ImageAttributes>>,
            Box::pin(self.get::<DocumentList<ImageAttributes>>(&secondary)) as _,
        ])
        .await;

        match Self::optional(document)? {
            Some(list) => Ok(list.data.into_iter().next().map(flatten_image)),
            None => Ok(None),
        }
    }

    /// Reserve an image slot for a subscription.
    pub async fn reserve_subscription_image(
        &self,
        subscription_id: &str,
        file_name: &str,
        file_size: u64,
    ) -> Result<ReservedAsset> {
        let body = serde_json::json!({
            "data": {
                "type": "subscriptionImages",
                "attributes": { "fileName": file_name, "fileSize": file_size },
                "relationships": {
                    "subscription": {
                        "data": { "type": "subscriptions", "id": subscription_id }
                    }
                }
            }
        });

        let document: Document<ImageAttributes> = self.post("/subscriptionImages", body).await?;
        let operations = document.data.attributes.upload_operations.ok_or_else(|| {
            ConnectError::UploadFailed("reservation returned no upload operations".to_string())
        })?;

        Ok(ReservedAsset {
            id: document.data.id,
            operations,
        })
    }

    /// Full delivery flow for a subscription image.
    pub async fn upload_subscription_image(
        &self,
        subscription_id: &str,
        file_name: &str,
        file: &[u8],
    ) -> Result<String> {
        let reserved = self
            .reserve_subscription_image(subscription_id, file_name, file.len() as u64)
            .await?;
        self.upload_asset(&reserved, file).await?;
        self.commit_asset("subscriptionImages", &reserved.id, file)
            .await?;
        Ok(reserved.id)
    }
}

fn flatten_image(resource: crate::jsonapi::Resource<ImageAttributes>) -> SubscriptionImage {
    let state = resource
        .attributes
        .asset_delivery_state
        .and_then(|s| s.state)
        .map(|s| AssetDeliveryState::from_str(&s))
        .unwrap_or(AssetDeliveryState::Processing);
    SubscriptionImage {
        id: resource.id,
        file_name: resource.attributes.file_name,
        state,
    }
}
