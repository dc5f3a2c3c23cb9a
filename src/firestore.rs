use anyhow::{anyhow, Result};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::auth::FirebaseAuth;

const BASE_URL: &str = "https://firestore.googleapis.com/v1";

#[derive(Clone)]
pub struct FirestoreClient {
    client: Client,
    auth: FirebaseAuth,
    project_id: String,
}

#[derive(Debug, Deserialize)]
pub struct Document {
    pub name: String,
    pub fields: Option<Map<String, Value>>,
}

impl Document {
    /// Last segment of the document path.
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or_default()
    }

    /// Fields decoded into plain JSON; an empty object for a field-less document.
    pub fn data(&self) -> Value {
        match self.fields {
            Some(ref fields) => parse_firestore_fields(fields),
            None => Value::Object(Map::new()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListDocumentsResponse {
    documents: Option<Vec<Document>>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

impl FirestoreClient {
    pub fn new(auth: FirebaseAuth, project_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            auth,
            project_id: project_id.into(),
        }
    }

    fn database(&self) -> String {
        format!("projects/{}/databases/(default)", self.project_id)
    }

    fn documents_base(&self) -> String {
        format!("{}/{}/documents", BASE_URL, self.database())
    }

    /// Full resource name, as used inside write requests.
    fn resource_name(&self, path: &str) -> String {
        format!("{}/documents/{}", self.database(), path)
    }

    /// Fetch a document, `None` if it doesn't exist.
    pub async fn get_document(&self, path: &str) -> Result<Option<Document>> {
        let token = self.auth.get_id_token().await?;
        let url = format!("{}/{}", self.documents_base(), path);
        debug!(path, "GET document");

        let resp = self.client.get(&url).bearer_auth(&token).send().await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = check(resp, "GET", path).await?;
        Ok(Some(resp.json().await?))
    }

    pub async fn list_documents(
        &self,
        collection_path: &str,
        page_size: Option<u32>,
        page_token: Option<&str>,
    ) -> Result<(Vec<Document>, Option<String>)> {
        let token = self.auth.get_id_token().await?;
        let url = format!("{}/{}", self.documents_base(), collection_path);
        debug!(path = collection_path, page_token, "LIST documents");

        let mut req = self.client.get(&url).bearer_auth(&token);

        if let Some(size) = page_size {
            req = req.query(&[("pageSize", size.to_string())]);
        }
        if let Some(pt) = page_token {
            req = req.query(&[("pageToken", pt)]);
        }

        let resp = check(req.send().await?, "LIST", collection_path).await?;

        let list_resp: ListDocumentsResponse = resp.json().await?;
        Ok((
            list_resp.documents.unwrap_or_default(),
            list_resp.next_page_token.filter(|pt| !pt.is_empty()),
        ))
    }

    /// Every document of a collection, following page tokens.
    pub async fn list_all_documents(&self, collection_path: &str) -> Result<Vec<Document>> {
        let mut all = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let (docs, next) = self
                .list_documents(collection_path, Some(300), page_token.as_deref())
                .await?;
            all.extend(docs);
            match next {
                Some(pt) => page_token = Some(pt),
                None => break,
            }
        }

        Ok(all)
    }

    /// Update (PATCH) specific fields in a document.
    /// Creates the document if it doesn't exist. With no field paths the
    /// whole document is replaced.
    pub async fn patch_document(
        &self,
        path: &str,
        fields: Map<String, Value>,
        field_paths: &[&str],
    ) -> Result<Document> {
        let token = self.auth.get_id_token().await?;
        let url = format!("{}/{}", self.documents_base(), path);
        debug!(path, ?field_paths, "PATCH document");

        let mut req = self.client.patch(&url).bearer_auth(&token);

        for fp in field_paths {
            req = req.query(&[("updateMask.fieldPaths", *fp)]);
        }

        let body = json!({
            "fields": fields
        });

        let resp = check(req.json(&body).send().await?, "PATCH", path).await?;
        Ok(resp.json().await?)
    }

    /// Deleting a missing document is not an error.
    pub async fn delete_document(&self, path: &str) -> Result<()> {
        let token = self.auth.get_id_token().await?;
        let url = format!("{}/{}", self.documents_base(), path);
        debug!(path, "DELETE document");

        let resp = self.client.delete(&url).bearer_auth(&token).send().await?;
        check(resp, "DELETE", path).await?;
        Ok(())
    }

    /// Atomically add to integer fields of an existing document.
    pub async fn increment_fields(&self, path: &str, deltas: &[(&str, i64)]) -> Result<()> {
        let token = self.auth.get_id_token().await?;
        let url = format!("{}:commit", self.documents_base());
        debug!(path, ?deltas, "COMMIT increment");

        let body = increment_write(&self.resource_name(path), deltas);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?;
        check(resp, "COMMIT", path).await?;
        Ok(())
    }
}

async fn check(resp: Response, verb: &str, path: &str) -> Result<Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    Err(anyhow!("{} {} failed: {} - {}", verb, path, status, body))
}

/// Commit body applying `increment` transforms, failing if the document is gone.
fn increment_write(document: &str, deltas: &[(&str, i64)]) -> Value {
    let transforms: Vec<Value> = deltas
        .iter()
        .map(|(field, delta)| {
            json!({
                "fieldPath": field,
                "increment": {"integerValue": delta.to_string()}
            })
        })
        .collect();

    json!({
        "writes": [{
            "transform": {
                "document": document,
                "fieldTransforms": transforms
            },
            "currentDocument": {"exists": true}
        }]
    })
}

/// Convert a serde_json::Value into Firestore's typed value format.
pub fn to_firestore_value(val: &Value) -> Value {
    match val {
        Value::Null => json!({"nullValue": null}),
        Value::Bool(b) => json!({"booleanValue": b}),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({"integerValue": i.to_string()}),
            None => json!({"doubleValue": n.as_f64()}),
        },
        Value::String(s) => json!({"stringValue": s}),
        Value::Array(arr) => {
            json!({"arrayValue": {"values": arr.iter().map(to_firestore_value).collect::<Vec<_>>()}})
        }
        Value::Object(map) => json!({"mapValue": {"fields": to_firestore_fields(map)}}),
    }
}

pub fn to_firestore_fields(obj: &Map<String, Value>) -> Map<String, Value> {
    obj.iter()
        .map(|(k, v)| (k.clone(), to_firestore_value(v)))
        .collect()
}

/// Parse a Firestore typed value into a serde_json::Value.
pub fn parse_firestore_value(val: &Value) -> Value {
    let Some((kind, inner)) = val.as_object().and_then(|m| m.iter().next()) else {
        return val.clone();
    };

    match kind.as_str() {
        // Firestore sends integers as strings
        "integerValue" => inner
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .map(Value::from)
            .unwrap_or_else(|| inner.clone()),
        "nullValue" => Value::Null,
        "mapValue" => inner
            .get("fields")
            .and_then(Value::as_object)
            .map(parse_firestore_fields)
            .unwrap_or_else(|| json!({})),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(parse_firestore_value).collect())
                .unwrap_or_default(),
        ),
        "stringValue" | "doubleValue" | "booleanValue" | "timestampValue" | "referenceValue"
        | "geoPointValue" | "bytesValue" => inner.clone(),
        _ => val.clone(),
    }
}

pub fn parse_firestore_fields(fields: &Map<String, Value>) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(k, v)| (k.clone(), parse_firestore_value(v)))
            .collect(),
    )
}

/// Read a number stored either as a number or as a numeric string.
pub fn number_field(obj: &Value, key: &str) -> Option<f64> {
    obj.get(key).and_then(|v| {
        v.as_f64()
            .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
    })
}

pub fn string_field(obj: &Value, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(String::from)
}
