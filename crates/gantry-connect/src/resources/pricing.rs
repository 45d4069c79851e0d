//! Price points, price schedules, and tax categories

use serde::Deserialize;

use crate::client::{try_candidates, Candidate, ConnectClient};
use crate::error::Result;
use crate::jsonapi::{Document, DocumentList};

/// A purchasable price point in one territory
#[derive(Debug, Clone)]
pub struct PricePoint {
    pub id: String,
    pub customer_price: String,
    pub proceeds: String,
}

/// A scheduled manual price
#[derive(Debug, Clone)]
pub struct AppPrice {
    pub id: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Tax category assigned to an app
#[derive(Debug, Clone)]
pub struct TaxCategory {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PricePointAttributes {
    #[serde(default)]
    customer_price: String,
    #[serde(default)]
    proceeds: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppPriceAttributes {
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaxCategoryAttributes {
    #[serde(default)]
    name: String,
}

impl ConnectClient {
    /// List price points available to an app in one territory.
    pub async fn list_price_points(
        &self,
        app_id: &str,
        territory: &str,
    ) -> Result<Vec<PricePoint>> {
        let endpoint =
            format!("/apps/{app_id}/appPricePoints?filter[territory]={territory}&limit=200");
        let document: DocumentList<PricePointAttributes> = self.get(&endpoint).await?;
        Ok(document
            .data
            .into_iter()
            .map(|r| PricePoint {
                id: r.id,
                customer_price: r.attributes.customer_price,
                proceeds: r.attributes.proceeds,
            })
            .collect())
    }

    /// Manual prices on an app's price schedule.
    pub async fn list_scheduled_prices(&self, app_id: &str) -> Result<Vec<AppPrice>> {
        let endpoint = format!("/appPriceSchedules/{app_id}/manualPrices");
        let document: DocumentList<AppPriceAttributes> = self.get(&endpoint).await?;
        Ok(document
            .data
            .into_iter()
            .map(|r| AppPrice {
                id: r.id,
                start_date: r.attributes.start_date,
                end_date: r.attributes.end_date,
            })
            .collect())
    }

    /// Tax category assigned to an app.
    ///
    /// The lookup path differs between accounts on old and new tax
    /// agreements; both are tried in order. Accounts with no category
    /// assigned are an explicit absent outcome.
    pub async fn find_tax_category(&self, app_id: &str) -> Result<Option<TaxCategory>> {
        let primary = format!("/apps/{app_id}/appTaxCategory");
        let secondary = format!("/apps/{app_id}/taxCategory");

        let result = try_candidates(vec![
            Box::pin(self.get::<Document<TaxCategoryAttributes>>(&primary))
                as Candidate<'_, Document<TaxCategoryAttributes>>,
            Box::pin(self.get::<Document<TaxCategoryAttributes>>(&secondary)) as _,
        ])
        .await;

        Ok(Self::optional(result)?.map(|document| TaxCategory {
            id: document.data.id,
            name: document.data.attributes.name,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::scripted_client;

    #[tokio::test]
    async fn price_points_flatten() {
        let client = scripted_client(vec![(
            200,
            r#"{"data": [{"type": "appPricePoints", "id": "pp1",
                 "attributes": {"customerPrice": "0.99", "proceeds": "0.70"}}]}"#,
        )]);

        let points = client.list_price_points("123", "USA").await.unwrap();
        assert_eq!(points[0].customer_price, "0.99");
        assert_eq!(points[0].proceeds, "0.70");
    }

    #[tokio::test]
    async fn tax_category_absent_on_both_paths_is_none() {
        let client = scripted_client(vec![
            (404, r#"{"errors": [{"status": "404", "title": "Not found"}]}"#),
            (404, r#"{"errors": [{"status": "404", "title": "Not found"}]}"#),
        ]);

        assert!(client.find_tax_category("123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn tax_category_primary_hit_skips_the_fallback() {
        let client = scripted_client(vec![(
            200,
            r#"{"data": {"type": "appTaxCategories", "id": "tc1",
                 "attributes": {"name": "Software"}}}"#,
        )]);

        let category = client.find_tax_category("123").await.unwrap().unwrap();
        assert_eq!(category.name, "Software");
    }
}
