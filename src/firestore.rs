//! Minimal Firestore REST client for the MacroTrack project.
//!
//! The dashboard reads and writes a handful of documents (`users/{id}`,
//! `login_sessions/{id}`) in a project whose security rules allow keyed
//! access without token auth, so this client carries no credential state.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::StoreError;

const BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Firebase project backing the MacroTrack apps.
pub const PROJECT_ID: &str = "macrotrack-88fd0";

/// A Firestore document as returned by the REST API.
#[derive(Debug, Deserialize)]
pub struct Document {
    pub name: String,
    pub fields: Option<Map<String, Value>>,
    #[serde(rename = "createTime")]
    pub create_time: Option<String>,
    #[serde(rename = "updateTime")]
    pub update_time: Option<String>,
}

impl Document {
    /// The document's fields decoded from Firestore's typed value format
    /// into a plain JSON object. Documents without fields decode to `{}`.
    pub fn decoded_fields(&self) -> Value {
        match self.fields {
            Some(ref fields) => Value::Object(
                fields
                    .iter()
                    .map(|(key, val)| (key.clone(), decode_value(val)))
                    .collect(),
            ),
            None => json!({}),
        }
    }
}

#[derive(Clone)]
pub struct FirestoreClient {
    http: Client,
    project_id: String,
}

impl Default for FirestoreClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FirestoreClient {
    pub fn new() -> Self {
        Self::with_project(PROJECT_ID)
    }

    /// Client against an alternate project (used by tests).
    pub fn with_project(project_id: &str) -> Self {
        Self {
            http: Client::new(),
            project_id: project_id.to_string(),
        }
    }

    fn document_url(&self, path: &str) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/{}",
            BASE_URL, self.project_id, path
        )
    }

    /// Fetches a single document by path (e.g. `users/abc123`).
    ///
    /// A 404 maps to [`StoreError::NotFound`] so callers can distinguish an
    /// unknown key from a connectivity failure.
    pub async fn get_document(&self, path: &str) -> Result<Document, StoreError> {
        let resp = self.http.get(self.document_url(path)).send().await?;

        match resp.status() {
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(path.to_string())),
            status if !status.is_success() => {
                let body = resp.text().await.unwrap_or_default();
                Err(StoreError::Request { status, body })
            }
            _ => Ok(resp.json().await?),
        }
    }

    /// Merges `fields` into a document, creating it if absent. Only the
    /// paths named in `field_paths` are touched.
    pub async fn patch_document(
        &self,
        path: &str,
        fields: Map<String, Value>,
        field_paths: &[&str],
    ) -> Result<Document, StoreError> {
        let mut req = self.http.patch(self.document_url(path));
        for fp in field_paths {
            req = req.query(&[("updateMask.fieldPaths", *fp)]);
        }

        let resp = req.json(&json!({ "fields": fields })).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Request { status, body });
        }
        Ok(resp.json().await?)
    }

    /// Deletes a document. Deleting a missing document is not an error.
    pub async fn delete_document(&self, path: &str) -> Result<(), StoreError> {
        let resp = self.http.delete(self.document_url(path)).send().await?;

        let status = resp.status();
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Request { status, body });
        }
        Ok(())
    }
}

/// Encodes a plain JSON value into Firestore's typed value format.
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": Value::Null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            // Firestore carries integers as decimal strings
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or_default() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

/// Encodes a JSON object's entries into Firestore document fields.
pub fn encode_fields(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(key, val)| (key.clone(), encode_value(val)))
        .collect()
}

/// Decodes one Firestore typed value into a plain JSON value.
///
/// Unknown value kinds pass through unchanged.
pub fn decode_value(value: &Value) -> Value {
    let Some(obj) = value.as_object() else {
        return Value::Null;
    };
    let Some((kind, inner)) = obj.iter().next() else {
        return Value::Null;
    };

    match kind.as_str() {
        "nullValue" => Value::Null,
        "stringValue" | "doubleValue" | "booleanValue" | "timestampValue" | "referenceValue" => {
            inner.clone()
        }
        "integerValue" => inner
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .map(|n| json!(n))
            .unwrap_or_else(|| inner.clone()),
        "mapValue" => match inner.get("fields").and_then(|f| f.as_object()) {
            Some(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(key, val)| (key.clone(), decode_value(val)))
                    .collect(),
            ),
            None => json!({}),
        },
        "arrayValue" => match inner.get("values").and_then(|v| v.as_array()) {
            Some(values) => Value::Array(values.iter().map(decode_value).collect()),
            None => json!([]),
        },
        _ => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_integer_as_string() {
        assert_eq!(
            encode_value(&json!(42)),
            json!({ "integerValue": "42" })
        );
        assert_eq!(encode_value(&json!(1.5)), json!({ "doubleValue": 1.5 }));
    }

    #[test]
    fn test_decode_integer_string_to_number() {
        assert_eq!(decode_value(&json!({ "integerValue": "1200" })), json!(1200));
    }

    #[test]
    fn test_decode_nested_record_shape() {
        // The shape `users/{id}` documents actually come back in: an array
        // of map values under `history`.
        let wire = json!({
            "arrayValue": { "values": [{
                "mapValue": { "fields": {
                    "date": { "stringValue": "2024-01-01" },
                    "calories": { "integerValue": "500" },
                    "p": { "doubleValue": 30.5 }
                }}
            }]}
        });
        assert_eq!(
            decode_value(&wire),
            json!([{ "date": "2024-01-01", "calories": 500, "p": 30.5 }])
        );
    }

    #[test]
    fn test_decode_empty_containers() {
        assert_eq!(decode_value(&json!({ "mapValue": {} })), json!({}));
        assert_eq!(decode_value(&json!({ "arrayValue": {} })), json!([]));
        assert_eq!(decode_value(&json!({ "nullValue": null })), Value::Null);
    }

    #[test]
    fn test_document_without_fields_decodes_to_empty_object() {
        let doc = Document {
            name: "projects/x/databases/(default)/documents/users/u1".to_string(),
            fields: None,
            create_time: None,
            update_time: None,
        };
        assert_eq!(doc.decoded_fields(), json!({}));
    }
}
