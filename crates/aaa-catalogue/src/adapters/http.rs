//! HTTP Catalogue
//!
//! Resolves items against a remote catalogue service with
//! `GET {base}/item?id=<id>`. The service may answer with a bare descriptor
//! or with a `{"results": [descriptor]}` envelope.

use aaa_core::ResourceDescriptor;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{CatalogueError, Result};
use crate::resolver::CatalogueResolver;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Deserialize)]
#[serde(untagged)]
enum ItemResponse {
    Envelope { results: Vec<ResourceDescriptor> },
    Item(ResourceDescriptor),
}

/// Remote catalogue client
pub struct HttpCatalogue {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpCatalogue {
    /// Create a client for the catalogue at `base_url`
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogueError::Unavailable(format!("cannot build client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl CatalogueResolver for HttpCatalogue {
    async fn resolve(&self, resource_id: &str) -> Result<ResourceDescriptor> {
        let url = format!("{}/item", self.base_url);
        debug!(url = %url, resource_id = %resource_id, "Querying catalogue");

        let response = self
            .http_client
            .get(&url)
            .query(&[("id", resource_id)])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(CatalogueError::NotFound(resource_id.to_string()));
        }

        let response = response.error_for_status().map_err(|e| {
            warn!(resource_id = %resource_id, error = %e, "Catalogue request failed");
            CatalogueError::Unavailable(e.to_string())
        })?;

        let body = response
            .bytes()
            .await
            .map_err(|e| CatalogueError::Unavailable(e.to_string()))?;

        let item = match serde_json::from_slice::<ItemResponse>(&body)? {
            ItemResponse::Item(item) => item,
            ItemResponse::Envelope { results } => results
                .into_iter()
                .find(|item| item.id == resource_id)
                .ok_or_else(|| CatalogueError::NotFound(resource_id.to_string()))?,
        };

        if item.id != resource_id {
            return Err(CatalogueError::InvalidResponse(format!(
                "asked for '{}', catalogue returned '{}'",
                resource_id, item.id
            )));
        }

        Ok(item)
    }

    fn description(&self) -> &str {
        "http catalogue"
    }
}
