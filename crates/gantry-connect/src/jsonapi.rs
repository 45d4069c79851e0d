//! JSON:API document plumbing
//!
//! Every App Store Connect endpoint wraps its payload in the same
//! `{type, id, attributes, relationships}` envelope with an `included`
//! side-array and pagination links. The resource modules deserialize into
//! these generic documents and reshape them into flat result types.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A single resource: `{type, id, attributes, relationships}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "A: serde::Deserialize<'de> + Default"))]
pub struct Resource<A> {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(default = "default_attributes")]
    pub attributes: A,
    #[serde(default)]
    pub relationships: Option<HashMap<String, Relationship>>,
}

fn default_attributes<A: Default>() -> A {
    A::default()
}

impl<A> Resource<A> {
    /// Id of a to-one relationship, when present and non-null.
    pub fn related_id(&self, name: &str) -> Option<&str> {
        match self.relationships.as_ref()?.get(name)?.data.as_ref()? {
            RelationshipData::One(r) => Some(r.id.as_str()),
            RelationshipData::Many(_) => None,
        }
    }

    /// Ids of a to-many relationship, empty when absent.
    pub fn related_ids(&self, name: &str) -> Vec<&str> {
        match self
            .relationships
            .as_ref()
            .and_then(|r| r.get(name))
            .and_then(|r| r.data.as_ref())
        {
            Some(RelationshipData::Many(refs)) => refs.iter().map(|r| r.id.as_str()).collect(),
            Some(RelationshipData::One(r)) => vec![r.id.as_str()],
            None => Vec::new(),
        }
    }
}

/// A relationship entry; `data` may be a single ref, a list, or null.
#[derive(Debug, Clone, Deserialize)]
pub struct Relationship {
    #[serde(default)]
    pub data: Option<RelationshipData>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RelationshipData {
    One(ResourceRef),
    Many(Vec<ResourceRef>),
}

/// A `{type, id}` reference to another resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRef {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

impl ResourceRef {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

/// Pagination and self links.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Links {
    #[serde(rename = "self")]
    pub this: Option<String>,
    pub next: Option<String>,
}

/// A single-resource document.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "A: serde::Deserialize<'de> + Default"))]
pub struct Document<A> {
    pub data: Resource<A>,
    #[serde(default)]
    pub included: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub meta: Option<serde_json::Value>,
}

/// A resource-list document with pagination links.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "A: serde::Deserialize<'de> + Default"))]
pub struct DocumentList<A> {
    pub data: Vec<Resource<A>>,
    #[serde(default)]
    pub included: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub links: Links,
    #[serde(default)]
    pub meta: Option<serde_json::Value>,
}

impl<A> Document<A> {
    /// Pull a typed resource out of the `included` side-array.
    pub fn included_as<B: DeserializeOwned + Default>(&self, kind: &str, id: &str) -> Option<Resource<B>> {
        find_included(self.included.as_deref(), kind, id)
    }
}

impl<A> DocumentList<A> {
    pub fn included_as<B: DeserializeOwned + Default>(&self, kind: &str, id: &str) -> Option<Resource<B>> {
        find_included(self.included.as_deref(), kind, id)
    }
}

fn find_included<B: DeserializeOwned + Default>(
    included: Option<&[serde_json::Value]>,
    kind: &str,
    id: &str,
) -> Option<Resource<B>> {
    included?.iter().find_map(|value| {
        let matches = value.get("type").and_then(|v| v.as_str()) == Some(kind)
            && value.get("id").and_then(|v| v.as_str()) == Some(id);
        if matches {
            serde_json::from_value(value.clone()).ok()
        } else {
            None
        }
    })
}

/// JSON:API error body: `{"errors": [{status, code, title, detail}]}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

/// Render the error body into one human-readable message, or `None` when
/// the bytes are not a JSON:API error document.
pub fn parse_error_body(body: &[u8]) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    if parsed.errors.is_empty() {
        return None;
    }
    let rendered: Vec<String> = parsed
        .errors
        .iter()
        .map(|e| {
            let headline = e
                .title
                .as_deref()
                .or(e.code.as_deref())
                .unwrap_or("API error");
            match &e.detail {
                Some(detail) => format!("{headline}: {detail}"),
                None => headline.to_string(),
            }
        })
        .collect();
    Some(rendered.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct AppAttributes {
        name: String,
        bundle_id: String,
    }

    #[test]
    fn deserializes_resource_list_with_links() {
        let body = r#"{
            "data": [
                {
                    "type": "apps",
                    "id": "123",
                    "attributes": {"name": "Demo", "bundleId": "com.example.demo"},
                    "relationships": {
                        "builds": {"data": [{"type": "builds", "id": "b1"}, {"type": "builds", "id": "b2"}]}
                    }
                }
            ],
            "links": {"self": "https://api/v1/apps", "next": "https://api/v1/apps?cursor=xyz"}
        }"#;

        let doc: DocumentList<AppAttributes> = serde_json::from_str(body).unwrap();
        assert_eq!(doc.data.len(), 1);
        let app = &doc.data[0];
        assert_eq!(app.kind, "apps");
        assert_eq!(app.attributes.bundle_id, "com.example.demo");
        assert_eq!(app.related_ids("builds"), vec!["b1", "b2"]);
        assert_eq!(doc.links.next.as_deref(), Some("https://api/v1/apps?cursor=xyz"));
    }

    #[test]
    fn null_relationship_data_is_absent() {
        let body = r#"{
            "data": {
                "type": "appStoreVersions",
                "id": "v1",
                "attributes": {"name": "", "bundleId": ""},
                "relationships": {"build": {"data": null}}
            }
        }"#;

        let doc: Document<AppAttributes> = serde_json::from_str(body).unwrap();
        assert_eq!(doc.data.related_id("build"), None);
        assert_eq!(doc.data.related_id("missing"), None);
    }

    #[test]
    fn missing_attributes_fall_back_to_default() {
        // DELETE-style relationship documents carry no attributes object.
        let body = r#"{"data": {"type": "apps", "id": "9"}}"#;
        let doc: Document<AppAttributes> = serde_json::from_str(body).unwrap();
        assert_eq!(doc.data.attributes.name, "");
    }

    #[test]
    fn pulls_typed_resources_from_included() {
        let body = r#"{
            "data": {
                "type": "betaAppReviewSubmissions",
                "id": "s1",
                "attributes": {"name": "", "bundleId": ""},
                "relationships": {"build": {"data": {"type": "builds", "id": "b7"}}}
            },
            "included": [
                {"type": "builds", "id": "b7", "attributes": {"name": "1.2.0", "bundleId": ""}}
            ]
        }"#;

        let doc: Document<AppAttributes> = serde_json::from_str(body).unwrap();
        let build_id = doc.data.related_id("build").unwrap();
        let build: Resource<AppAttributes> = doc.included_as("builds", build_id).unwrap();
        assert_eq!(build.attributes.name, "1.2.0");
    }

    #[test]
    fn renders_error_bodies() {
        let body = br#"{
            "errors": [
                {"status": "409", "code": "STATE_ERROR", "title": "The request cannot be fulfilled.", "detail": "Version is not editable."},
                {"status": "409", "code": "ENTITY_ERROR"}
            ]
        }"#;

        let message = parse_error_body(body).unwrap();
        assert_eq!(
            message,
            "The request cannot be fulfilled.: Version is not editable.; ENTITY_ERROR"
        );
    }

    #[test]
    fn non_error_bodies_yield_none() {
        assert_eq!(parse_error_body(b"<html>gateway timeout</html>"), None);
        assert_eq!(parse_error_body(br#"{"errors": []}"#), None);
        assert_eq!(parse_error_body(br#"{"data": []}"#), None);
    }
}
