//! App lookup and listing

use serde::Deserialize;

use crate::client::ConnectClient;
use crate::error::Result;
use crate::jsonapi::DocumentList;

/// App summary
#[derive(Debug, Clone)]
pub struct App {
    pub id: String,
    pub name: String,
    pub bundle_id: String,
    pub sku: Option<String>,
    pub primary_locale: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppAttributes {
    #[serde(default)]
    name: String,
    #[serde(default)]
    bundle_id: String,
    #[serde(default)]
    sku: Option<String>,
    #[serde(default)]
    primary_locale: Option<String>,
}

impl ConnectClient {
    /// List every app visible to the key, following pagination.
    pub async fn list_apps(&self) -> Result<Vec<App>> {
        let resources = self.get_all::<AppAttributes>("/apps?limit=200").await?;
        Ok(resources.into_iter().map(flatten).collect())
    }

    /// Look up a single app by bundle id. An app that does not exist is an
    /// explicit absent outcome, not an error.
    pub async fn find_app_by_bundle_id(&self, bundle_id: &str) -> Result<Option<App>> {
        let endpoint = format!("/apps?filter[bundleId]={bundle_id}");
        let document: DocumentList<AppAttributes> = self.get(&endpoint).await?;
        Ok(document.data.into_iter().next().map(flatten))
    }

    /// Get an app by its App Store Connect id.
    pub async fn get_app(&self, app_id: &str) -> Result<App> {
        let document: crate::jsonapi::Document<AppAttributes> =
            self.get(&format!("/apps/{app_id}")).await?;
        Ok(flatten(document.data))
    }
}

fn flatten(resource: crate::jsonapi::Resource<AppAttributes>) -> App {
    App {
        id: resource.id,
        name: resource.attributes.name,
        bundle_id: resource.attributes.bundle_id,
        sku: resource.attributes.sku,
        primary_locale: resource.attributes.primary_locale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::scripted_client;

    #[tokio::test]
    async fn find_by_bundle_id_flattens_the_first_match() {
        let client = scripted_client(vec![(
            200,
            r#"{"data": [{
                "type": "apps", "id": "123",
                "attributes": {"name": "Demo", "bundleId": "com.example.demo", "sku": "DEMO1", "primaryLocale": "en-US"}
            }]}"#,
        )]);

        let app = client
            .find_app_by_bundle_id("com.example.demo")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(app.id, "123");
        assert_eq!(app.bundle_id, "com.example.demo");
        assert_eq!(app.primary_locale.as_deref(), Some("en-US"));
    }

    #[tokio::test]
    async fn missing_app_is_an_absent_outcome() {
        let client = scripted_client(vec![(200, r#"{"data": []}"#)]);
        let app = client.find_app_by_bundle_id("com.example.gone").await.unwrap();
        assert!(app.is_none());
    }
}
