//! Customer reviews and review responses

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::client::ConnectClient;
use crate::error::Result;
use crate::jsonapi::{Document, DocumentList};

/// A customer review
#[derive(Debug, Clone)]
pub struct CustomerReview {
    pub id: String,
    pub rating: u8,
    pub title: Option<String>,
    pub body: Option<String>,
    pub reviewer_nickname: Option<String>,
    pub territory: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// A developer response to a review
#[derive(Debug, Clone)]
pub struct ReviewResponse {
    pub id: String,
    pub body: String,
    pub state: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewAttributes {
    #[serde(default)]
    rating: u8,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    reviewer_nickname: Option<String>,
    #[serde(default)]
    territory: Option<String>,
    #[serde(default)]
    created_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseAttributes {
    #[serde(default)]
    response_body: String,
    #[serde(default)]
    state: String,
}

/// Filters for listing customer reviews.
#[derive(Debug, Clone, Default)]
pub struct ReviewFilter {
    pub rating: Option<u8>,
    pub territory: Option<String>,
}

impl ConnectClient {
    /// List customer reviews for an app, newest first, following
    /// pagination.
    pub async fn list_customer_reviews(
        &self,
        app_id: &str,
        filter: &ReviewFilter,
    ) -> Result<Vec<CustomerReview>> {
        let mut endpoint = format!("/apps/{app_id}/customerReviews?sort=-createdDate&limit=200");
        if let Some(rating) = filter.rating {
            endpoint.push_str(&format!("&filter[rating]={rating}"));
        }
        if let Some(territory) = &filter.territory {
            endpoint.push_str(&format!("&filter[territory]={territory}"));
        }

        let resources = self.get_all::<ReviewAttributes>(&endpoint).await?;
        Ok(resources.into_iter().map(flatten_review).collect())
    }

    /// The developer response on a review; most reviews have none, which
    /// is an explicit absent outcome.
    pub async fn find_review_response(&self, review_id: &str) -> Result<Option<ReviewResponse>> {
        let endpoint = format!("/customerReviews/{review_id}/response");
        let result = self.get::<Document<ResponseAttributes>>(&endpoint).await;
        Ok(Self::optional(result)?.map(|d| flatten_response(d.data)))
    }

    /// Create or replace the developer response on a review.
    pub async fn respond_to_review(
        &self,
        review_id: &str,
        response_body: &str,
    ) -> Result<ReviewResponse> {
        let body = serde_json::json!({
            "data": {
                "type": "customerReviewResponses",
                "attributes": { "responseBody": response_body },
                "relationships": {
                    "review": {
                        "data": { "type": "customerReviews", "id": review_id }
                    }
                }
            }
        });

        let document: Document<ResponseAttributes> =
            self.post("/customerReviewResponses", body).await?;
        Ok(flatten_response(document.data))
    }

    /// Delete the developer response on a review.
    pub async fn delete_review_response(&self, response_id: &str) -> Result<()> {
        self.delete(&format!("/customerReviewResponses/{response_id}"), None)
            .await
    }
}

fn flatten_review(resource: crate::jsonapi::Resource<ReviewAttributes>) -> CustomerReview {
    let a = resource.attributes;
    CustomerReview {
        id: resource.id,
        rating: a.rating,
        title: a.title,
        body: a.body,
        reviewer_nickname: a.reviewer_nickname,
        territory: a.territory,
        created_at: a
            .created_date
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|d| d.with_timezone(&Utc)),
    }
}

fn flatten_response(resource: crate::jsonapi::Resource<ResponseAttributes>) -> ReviewResponse {
    ReviewResponse {
        id: resource.id,
        body: resource.attributes.response_body,
        state: resource.attributes.state,
    }
}
