use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::models::{FilterSpec, Professional, VerificationState};
use crate::services::store::{FilterRegistry, StoreError, VerificationSource};

/// Errors that can occur when interacting with the hosted backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Unauthorized: invalid API key or token")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl From<BackendError> for StoreError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::InvalidResponse(msg) => StoreError::InvalidResponse(msg),
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

/// Collection IDs in the backend database
#[derive(Debug, Clone)]
pub struct BackendCollections {
    pub professionals: String,
    pub filters: String,
    pub verifications: String,
}

/// REST client for the hosted backend's document API
///
/// Serves as both the filter registry (professionals and their filters) and
/// the verification collaborator used by the offer gate.
pub struct BackendClient {
    base_url: String,
    api_key: String,
    project_id: String,
    database_id: String,
    client: Client,
    collections: BackendCollections,
    page_size: usize,
}

const DEFAULT_PAGE_SIZE: usize = 500;

#[derive(Debug, Deserialize)]
struct ProfessionalDocument {
    #[serde(rename = "professionalId", default)]
    professional_id: Option<String>,
    #[serde(rename = "$id", default)]
    document_id: Option<String>,
    #[serde(default)]
    name: String,
}

impl ProfessionalDocument {
    fn into_professional(self) -> Option<Professional> {
        let id = self.professional_id.or(self.document_id)?;
        Some(Professional { id, name: self.name })
    }
}

impl BackendClient {
    /// Create a new backend client
    pub fn new(
        base_url: String,
        api_key: String,
        project_id: String,
        database_id: String,
        collections: BackendCollections,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            api_key,
            project_id,
            database_id,
            client,
            collections,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Documents requested per page when listing professionals
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn documents_url(&self, collection: &str, queries: &[String]) -> Result<String, BackendError> {
        let queries_json = serde_json::to_string(queries)
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        Ok(format!(
            "{}/databases/{}/collections/{}/documents?queries={}",
            self.base_url.trim_end_matches('/'),
            self.database_id,
            collection,
            urlencoding::encode(&queries_json)
        ))
    }

    /// Run a document query and return the raw `documents` array
    async fn list_documents(
        &self,
        collection: &str,
        queries: &[String],
    ) -> Result<Vec<Value>, BackendError> {
        let url = self.documents_url(collection, queries)?;

        tracing::debug!("Querying backend collection {}", collection);

        let response = self
            .client
            .get(&url)
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(BackendError::Unauthorized);
            }
            status if !status.is_success() => {
                return Err(BackendError::ApiError(format!(
                    "Failed to query {}: {}",
                    collection, status
                )));
            }
            _ => {}
        }

        let mut json: Value = response.json().await?;

        match json.get_mut("documents").map(Value::take) {
            Some(Value::Array(documents)) => Ok(documents),
            _ => Err(BackendError::InvalidResponse("Missing documents array".into())),
        }
    }

    /// List professionals whose account is active, following pages until a
    /// short page is returned
    pub async fn get_active_professionals(&self) -> Result<Vec<Professional>, BackendError> {
        let mut documents = Vec::new();
        let mut offset = 0;

        loop {
            let queries = vec![
                "equal(\"isActive\", true)".to_string(),
                "orderAsc(\"$id\")".to_string(),
                format!("limit({})", self.page_size),
                format!("offset({})", offset),
            ];

            let page = self
                .list_documents(&self.collections.professionals, &queries)
                .await?;
            let fetched = page.len();
            documents.extend(page);

            if fetched < self.page_size {
                break;
            }
            offset += fetched;
        }

        let total = documents.len();
        let professionals: Vec<Professional> = documents
            .into_iter()
            .filter_map(|doc| {
                let data = document_data(doc);
                match serde_json::from_value::<ProfessionalDocument>(data) {
                    Ok(p) => p.into_professional(),
                    Err(e) => {
                        tracing::warn!("Skipping malformed professional document: {}", e);
                        None
                    }
                }
            })
            .collect();

        tracing::debug!("Loaded {} active professionals ({} documents)", professionals.len(), total);

        Ok(professionals)
    }

    /// Fetch the filter configured by a professional, if any
    pub async fn get_filter(&self, professional_id: &str) -> Result<Option<FilterSpec>, BackendError> {
        let queries = vec![
            equal_query("professionalId", professional_id),
            "limit(1)".to_string(),
        ];

        let documents = self.list_documents(&self.collections.filters, &queries).await?;

        let Some(doc) = documents.into_iter().next() else {
            return Ok(None);
        };

        let mut data = document_data(doc);
        // Nested filter criteria are stored as JSON-encoded string attributes
        for key in ["brands", "priceRange", "mileageRange"] {
            decode_string_attribute(&mut data, key)?;
        }

        serde_json::from_value(data)
            .map(Some)
            .map_err(|e| BackendError::InvalidResponse(format!("Failed to parse filter: {}", e)))
    }

    /// Fetch a professional's verification state, if recorded
    pub async fn get_verification(
        &self,
        professional_id: &str,
    ) -> Result<Option<VerificationState>, BackendError> {
        let queries = vec![
            equal_query("professionalId", professional_id),
            "limit(1)".to_string(),
        ];

        let documents = self
            .list_documents(&self.collections.verifications, &queries)
            .await?;

        let Some(doc) = documents.into_iter().next() else {
            return Ok(None);
        };

        serde_json::from_value(document_data(doc))
            .map(Some)
            .map_err(|e| BackendError::InvalidResponse(format!("Failed to parse verification: {}", e)))
    }
}

fn equal_query(attribute: &str, value: &str) -> String {
    // serde_json quotes and escapes the value
    let quoted = serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string());
    format!("equal(\"{}\", {})", attribute, quoted)
}

/// Unwrap the `data` envelope some document responses carry
fn document_data(mut doc: Value) -> Value {
    match doc.get_mut("data").map(Value::take) {
        Some(data @ Value::Object(_)) => data,
        _ => doc,
    }
}

fn decode_string_attribute(data: &mut Value, key: &str) -> Result<(), BackendError> {
    if let Some(slot) = data.get_mut(key) {
        if let Value::String(raw) = slot {
            let decoded = serde_json::from_str(raw).map_err(|e| {
                BackendError::InvalidResponse(format!("Attribute {} is not valid JSON: {}", key, e))
            })?;
            *slot = decoded;
        }
    }
    Ok(())
}

#[async_trait]
impl FilterRegistry for BackendClient {
    async fn list_active_professionals(&self) -> Result<Vec<Professional>, StoreError> {
        self.get_active_professionals().await.map_err(Into::into)
    }

    async fn get_filter_spec(&self, professional_id: &str) -> Result<Option<FilterSpec>, StoreError> {
        self.get_filter(professional_id).await.map_err(Into::into)
    }
}

#[async_trait]
impl VerificationSource for BackendClient {
    async fn get_verification_state(
        &self,
        professional_id: &str,
    ) -> Result<Option<VerificationState>, StoreError> {
        self.get_verification(professional_id).await.map_err(Into::into)
    }
}
