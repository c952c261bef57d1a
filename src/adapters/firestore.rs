//! Usage documents read through the Firestore REST API.

use crate::adapters::join_segments;
use crate::domain::ports::UsageStore;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::HashMap;

pub const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";
pub const DEFAULT_USAGE_COLLECTION: &str = "StudentUsage";
pub const OPENED_IDS_FIELD: &str = "openedIDs";

#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default)]
    fields: HashMap<String, FieldValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldValue {
    string_value: Option<String>,
    // Firestore encodes int64 as a JSON string
    integer_value: Option<String>,
    array_value: Option<ArrayValue>,
}

#[derive(Debug, Default, Deserialize)]
struct ArrayValue {
    #[serde(default)]
    values: Vec<FieldValue>,
}

impl FieldValue {
    fn into_id(self) -> Option<String> {
        self.string_value.or(self.integer_value)
    }
}

pub struct FirestoreStore {
    client: Client,
    base_url: String,
    project_id: String,
    collection: String,
    access_token: Option<SecretString>,
}

impl FirestoreStore {
    pub fn new(client: Client, project_id: impl Into<String>) -> Self {
        Self {
            client,
            base_url: DEFAULT_FIRESTORE_BASE_URL.to_string(),
            project_id: project_id.into(),
            collection: DEFAULT_USAGE_COLLECTION.to_string(),
            access_token: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_access_token(mut self, access_token: SecretString) -> Self {
        self.access_token = Some(access_token);
        self
    }
}

fn store_error(e: reqwest::Error) -> EtlError {
    EtlError::DataStoreError {
        message: e.to_string(),
    }
}

#[async_trait]
impl UsageStore for FirestoreStore {
    async fn opened_ids(&self, date: &str) -> Result<Option<Vec<String>>> {
        let url = join_segments(
            &self.base_url,
            &[
                "projects",
                &self.project_id,
                "databases",
                "(default)",
                "documents",
                &self.collection,
                date,
            ],
        )?;

        let mut request = self.client.get(url);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await.map_err(store_error)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let mut document: Document = response
            .error_for_status()
            .map_err(store_error)?
            .json()
            .await
            .map_err(store_error)?;

        let ids = document
            .fields
            .remove(OPENED_IDS_FIELD)
            .and_then(|value| value.array_value)
            .unwrap_or_default()
            .values
            .into_iter()
            .filter_map(FieldValue::into_id)
            .collect();

        Ok(Some(ids))
    }
}
