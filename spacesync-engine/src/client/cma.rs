//! Content Management API implementation.
//!
//! Speaks the backend's HTTP management surface: bearer-token auth,
//! JSON bodies, `X-Contentful-Version` for optimistic concurrency and
//! `X-Contentful-RateLimit-Reset` as the 429 backoff hint.

use super::space::{ListQuery, ManagementClient, SpaceClient};
use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use spacesync_types::{Entity, ResourceKind};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Response header carrying seconds until the request quota replenishes.
const RATE_LIMIT_RESET_HEADER: &str = "X-Contentful-RateLimit-Reset";

/// Request header carrying the optimistic-concurrency version on updates.
const VERSION_HEADER: &str = "X-Contentful-Version";

/// CMA client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmaConfig {
    /// Management token used as bearer auth.
    pub token: String,
    /// Base URL of the management API (e.g. `https://api.contentful.com`).
    pub api_base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for CmaConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_base_url: "https://api.contentful.com".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Management API client.
pub struct CmaClient {
    config: CmaConfig,
    client: Client,
}

impl CmaClient {
    /// Creates a new management client.
    pub fn new(config: CmaConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("failed to create HTTP client");

        Self { config, client }
    }
}

#[async_trait]
impl ManagementClient for CmaClient {
    async fn space(&self, space_id: &str) -> SyncResult<Arc<dyn SpaceClient>> {
        debug!("Resolving space {}", space_id);

        let response = self
            .client
            .get(format!("{}/spaces/{}", self.config.api_base_url, space_id))
            .bearer_auth(&self.config.token)
            .send()
            .await?;

        if response.status().as_u16() == 404 {
            return Err(SyncError::SpaceNotFound(space_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(Arc::new(CmaSpace {
            space_id: space_id.to_string(),
            config: self.config.clone(),
            client: self.client.clone(),
        }))
    }
}

/// One resolved space on the management API.
struct CmaSpace {
    space_id: String,
    config: CmaConfig,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct ResourceArray {
    #[serde(default)]
    items: Vec<Entity>,
}

impl CmaSpace {
    fn collection_url(&self, kind: ResourceKind) -> String {
        format!(
            "{}/spaces/{}/{}",
            self.config.api_base_url,
            self.space_id,
            kind.collection()
        )
    }

    fn resource_url(&self, kind: ResourceKind, id: &str) -> String {
        format!("{}/{}", self.collection_url(kind), id)
    }

    fn body_of(entity: &Entity) -> serde_json::Value {
        serde_json::Value::Object(entity.payload.clone())
    }
}

#[async_trait]
impl SpaceClient for CmaSpace {
    async fn list(&self, kind: ResourceKind, query: &ListQuery) -> SyncResult<Vec<Entity>> {
        let response = self
            .client
            .get(self.collection_url(kind))
            .bearer_auth(&self.config.token)
            .query(&query.to_params())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let array: ResourceArray = response.json().await?;
        Ok(array.items)
    }

    async fn create(
        &self,
        kind: ResourceKind,
        id: Option<&str>,
        entity: &Entity,
    ) -> SyncResult<Entity> {
        let request = match id {
            Some(id) => self.client.put(self.resource_url(kind, id)),
            None => self.client.post(self.collection_url(kind)),
        };

        let response = request
            .bearer_auth(&self.config.token)
            .json(&Self::body_of(entity))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(response.json().await?)
    }

    async fn update(
        &self,
        kind: ResourceKind,
        id: &str,
        version: u64,
        entity: &Entity,
    ) -> SyncResult<Entity> {
        let response = self
            .client
            .put(self.resource_url(kind, id))
            .bearer_auth(&self.config.token)
            .header(VERSION_HEADER, version)
            .json(&Self::body_of(entity))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(response.json().await?)
    }
}

// ── Error classification ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    sys: Option<ApiErrorSys>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<ApiErrorDetails>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorSys {
    #[serde(default)]
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetails {
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    name: String,
    #[serde(default)]
    path: Vec<serde_json::Value>,
}

impl ApiErrorDetail {
    /// Field name of an unknown-field detail: the segment after the
    /// leading `fields` in its path.
    fn unknown_field_name(&self) -> Option<String> {
        if self.name != "unknown" {
            return None;
        }
        match self.path.as_slice() {
            [first, second, ..] if first.as_str() == Some("fields") => {
                second.as_str().map(str::to_string)
            }
            _ => None,
        }
    }
}

/// Maps a non-success response to the typed error set.
async fn error_from_response(response: Response) -> SyncError {
    let status = response.status().as_u16();

    if status == 429 {
        let reset_secs = response
            .headers()
            .get(RATE_LIMIT_RESET_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(1);
        return SyncError::RateLimited { reset_secs };
    }

    let body = response.text().await.unwrap_or_default();
    classify_error_body(status, &body)
}

/// Classifies an error body into the typed error set.
///
/// The backend identifies errors by `sys.id` plus a `details.errors`
/// list; everything unrecognized stays a generic `Api` error.
fn classify_error_body(status: u16, body: &str) -> SyncError {
    if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) {
        let error_id = parsed.sys.as_ref().map(|sys| sys.id.as_str());
        let details = parsed
            .details
            .map(|details| details.errors)
            .unwrap_or_default();

        let unknown: Vec<String> = details
            .iter()
            .filter_map(ApiErrorDetail::unknown_field_name)
            .collect();
        if error_id == Some("UnknownField") && !unknown.is_empty() {
            return SyncError::UnknownFields { fields: unknown };
        }

        if error_id == Some("ValidationFailed") && details.iter().any(|d| d.name == "taken") {
            return SyncError::AlreadyExists;
        }

        if let Some(message) = parsed.message {
            return SyncError::Api { status, message };
        }
    }

    SyncError::Api {
        status,
        message: body.to_string(),
    }
}
