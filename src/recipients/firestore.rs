//! Firestore REST document reader
//!
//! Reads one document with `GET /v1/projects/{p}/databases/{db}/documents/{collection}/{doc}`
//! and pulls the mailing list out of a single field. The field may be an
//! array of strings or one string holding newline/comma separated addresses.

use crate::config::FirestoreSettings;
use crate::error::{MailoutError, Result};
use crate::recipients::filter_addresses;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

pub const FIRESTORE_ROOT: &str = "https://firestore.googleapis.com";

/// Location of the mailing list document plus how to authenticate
#[derive(Debug, Clone, PartialEq)]
pub struct FirestoreDocument {
    pub project_id: String,
    pub database: String,
    pub collection: String,
    pub document: String,
    pub field: String,
    pub access_token: Option<String>,
    pub api_key: Option<String>,
    pub root: String,
}

#[derive(Debug, Deserialize)]
struct DocumentResponse {
    #[serde(default)]
    fields: HashMap<String, Value>,
}

impl FirestoreDocument {
    pub fn from_settings(settings: &FirestoreSettings) -> Result<Self> {
        let project_id = settings
            .project_id
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                MailoutError::ConfigError(
                    "FIREBASE_PROJECT_ID must be set to fetch recipients from Firestore.".into(),
                )
            })?;

        Ok(Self {
            project_id: project_id.to_string(),
            database: settings.database.clone(),
            collection: settings.collection.clone(),
            document: settings.document.clone(),
            field: settings.field.clone(),
            access_token: settings.access_token.clone(),
            api_key: settings.api_key.clone(),
            root: settings
                .base_url
                .as_deref()
                .unwrap_or(FIRESTORE_ROOT)
                .trim_end_matches('/')
                .to_string(),
        })
    }

    pub fn url(&self) -> String {
        format!(
            "{}/v1/projects/{}/databases/{}/documents/{}/{}",
            self.root, self.project_id, self.database, self.collection, self.document
        )
    }

    /// GET the document and extract the configured field
    pub async fn fetch_recipients(&self) -> Result<Vec<String>> {
        let url = self.url();
        debug!("GET {}", url);

        let mut request = Client::new().get(&url);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key)]);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailoutError::FirestoreError(format!(
                "Failed to fetch recipients from Firestore: HTTP {}: {}",
                status,
                firestore_error_message(&body)
            )));
        }

        let document: DocumentResponse = response.json().await?;
        let value = document.fields.get(&self.field).ok_or_else(|| {
            MailoutError::FirestoreError(format!(
                "Field '{}' not found in {}/{}",
                self.field, self.collection, self.document
            ))
        })?;

        addresses_from_value(value).ok_or_else(|| {
            MailoutError::FirestoreError(format!(
                "Field '{}' must be an array of strings or a string",
                self.field
            ))
        })
    }
}

/// Decode a Firestore typed value into addresses
pub fn addresses_from_value(value: &Value) -> Option<Vec<String>> {
    if let Some(array) = value.get("arrayValue") {
        let values = array
            .get("values")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.get("stringValue").and_then(Value::as_str))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        return Some(filter_addresses(values));
    }

    if let Some(text) = value.get("stringValue").and_then(Value::as_str) {
        return Some(filter_addresses(text.split(['\n', ','])));
    }

    None
}

/// `{"error": {"message": ...}}` as returned by Google APIs
fn firestore_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_addresses_from_array_value() {
        let value = json!({"arrayValue": {"values": [
            {"stringValue": "a@example.com"},
            {"stringValue": " b@example.com "},
            {"integerValue": "3"},
            {"stringValue": "nope"}
        ]}});
        assert_eq!(
            addresses_from_value(&value).unwrap(),
            vec!["a@example.com", "b@example.com"]
        );
    }

    #[test]
    fn test_addresses_from_empty_array() {
        let value = json!({"arrayValue": {}});
        assert_eq!(addresses_from_value(&value).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_addresses_from_string_value() {
        let value = json!({"stringValue": "a@example.com, b@example.com\nc@example.com"});
        assert_eq!(
            addresses_from_value(&value).unwrap(),
            vec!["a@example.com", "b@example.com", "c@example.com"]
        );
    }

    #[test]
    fn test_addresses_from_unsupported_value() {
        assert!(addresses_from_value(&json!({"booleanValue": true})).is_none());
    }

    #[test]
    fn test_document_url_and_required_project() {
        let mut settings = FirestoreSettings::default();
        assert!(FirestoreDocument::from_settings(&settings).is_err());

        settings.project_id = Some("skf-site".into());
        let doc = FirestoreDocument::from_settings(&settings).unwrap();
        assert_eq!(
            doc.url(),
            "https://firestore.googleapis.com/v1/projects/skf-site/databases/(default)/documents/config/email_recipients"
        );
    }

    #[test]
    fn test_firestore_error_message() {
        let body = r#"{"error":{"code":404,"message":"Document not found","status":"NOT_FOUND"}}"#;
        assert_eq!(firestore_error_message(body), "Document not found");
        assert_eq!(firestore_error_message("oops"), "oops");
    }
}
