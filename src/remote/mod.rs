//! Client for the remote vocabulary search index (Solr-style HTTP API).
//!
//! Endpoints, relative to `{base_url}/{core}`:
//! - `GET  /select`              queries (`q`, `rows`, `start`, `sort`, `fl`, repeated `fq`)
//! - `POST /update?commit=true`  JSON array upsert, or `{"delete": {"id": ..}}`
//! - `GET  /admin/ping`          health probe
//!
//! The client holds only immutable configuration and is cheap to clone.
//! Nothing here retries; the remote index is a secondary source.

pub mod types;

use std::time::Duration;

use rand_core::{OsRng, RngCore};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::RemoteConfig;

pub use types::{
    CategoryCount, FieldValue, Filter, IndexDocument, IndexStatistics, SearchPage, SearchRequest,
    SearchResult, VocabularyRecord,
};
use types::SelectResponse;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("no document with id '{0}'")]
    NotFound(String),

    #[error("no documents match")]
    NoData,

    #[error("transport: {0}")]
    Transport(String),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone)]
pub struct RemoteIndexClient {
    client: Client,
    base_url: String,
    core: String,
}

impl RemoteIndexClient {
    /// `timeout` of `None` leaves the transport's own default in place.
    pub fn new(
        base_url: impl Into<String>,
        core: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, RemoteError> {
        let mut builder = Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder
            .build()
            .map_err(|e| RemoteError::Transport(format!("failed to build HTTP client: {e}")))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url, core: core.into() })
    }

    pub fn from_config(config: &RemoteConfig) -> Result<Self, RemoteError> {
        Self::new(
            config.base_url.clone(),
            config.core.clone(),
            config.timeout_seconds.map(Duration::from_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.core, path)
    }

    // ── Queries ─────────────────────────────────────────────────────────────

    async fn select(&self, params: &[(&str, String)]) -> Result<SelectResponse, RemoteError> {
        let url = self.endpoint("select");
        debug!(url = %url, params = params.len(), "index select");
        let response = self.client.get(&url).query(params).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "index select failed (transport)");
            RemoteError::Transport(e.to_string())
        })?;
        let response = check_status(response).await?;
        response
            .json::<SelectResponse>()
            .await
            .map_err(|e| RemoteError::Decode(format!("select response: {e}")))
    }

    /// Run one query and return the raw page.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchPage, RemoteError> {
        let parsed = self.select(&request.to_params()).await?;
        Ok(SearchPage {
            docs: parsed.response.docs,
            total: parsed.response.num_found,
            start: parsed.response.start,
        })
    }

    /// [`search`](Self::search) with failures folded into the result.
    pub async fn search_vocabulary(&self, request: &SearchRequest) -> SearchResult {
        match self.search(request).await {
            Ok(page) => SearchResult {
                success: true,
                error: None,
                data: page.docs,
                total: page.total,
                start: page.start,
            },
            Err(e) => SearchResult {
                success: false,
                error: Some(e.to_string()),
                data: Vec::new(),
                total: 0,
                start: 0,
            },
        }
    }

    pub async fn get_vocabulary_by_id(&self, id: &str) -> Result<IndexDocument, RemoteError> {
        let request = SearchRequest {
            rows: 1,
            filters: vec![Filter::eq("id", id)],
            ..Default::default()
        };
        self.search(&request)
            .await?
            .docs
            .into_iter()
            .next()
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))
    }

    /// Up to `count` documents from a pseudo-random window of the matches.
    ///
    /// Counts first, then reads from an offset in `[0, max(1, total - count))`.
    /// Positional, so documents near the chosen offset are favoured.
    pub async fn get_random_vocabulary(
        &self,
        count: usize,
        filters: &[Filter],
    ) -> Result<SearchPage, RemoteError> {
        let probe = SearchRequest { rows: 0, filters: filters.to_vec(), ..Default::default() };
        let total = self.search(&probe).await?.total;
        if total == 0 {
            return Err(RemoteError::NoData);
        }
        let span = total.saturating_sub(count as u64).max(1);
        let offset = OsRng.next_u64() % span;
        debug!(total, count, offset, "random window");

        let request = SearchRequest {
            rows: count,
            start: offset as usize,
            filters: filters.to_vec(),
            ..Default::default()
        };
        self.search(&request).await
    }

    pub async fn get_statistics(&self) -> Result<IndexStatistics, RemoteError> {
        let params = [
            ("q", "*:*".to_string()),
            ("rows", "0".to_string()),
            ("wt", "json".to_string()),
            ("facet", "true".to_string()),
            ("facet.field", "category".to_string()),
            ("facet.limit", "-1".to_string()),
            ("facet.mincount", "1".to_string()),
        ];
        let parsed = self.select(&params).await?;
        let categories = parsed.facet_counts.unwrap_or_default().terms("category");
        Ok(IndexStatistics { total: parsed.response.num_found, categories })
    }

    // ── Updates ─────────────────────────────────────────────────────────────

    async fn update(&self, body: &Value) -> Result<(), RemoteError> {
        let url = self.endpoint("update");
        let response = self
            .client
            .post(&url)
            .query(&[("commit", "true"), ("wt", "json")])
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "index update failed (transport)");
                RemoteError::Transport(e.to_string())
            })?;
        check_status(response).await.map(|_| ())
    }

    /// Upsert one record and commit.
    pub async fn add_vocabulary(&self, record: &VocabularyRecord) -> Result<(), RemoteError> {
        self.update(&Value::Array(vec![record.to_document()])).await?;
        debug!(id = %record.id, "index upsert committed");
        Ok(())
    }

    pub async fn delete_vocabulary(&self, id: &str) -> Result<(), RemoteError> {
        self.update(&json!({ "delete": { "id": id } })).await?;
        debug!(id, "index delete committed");
        Ok(())
    }

    /// Health probe. Any transport error or non-2xx status is `false`.
    pub async fn is_available(&self) -> bool {
        let url = self.endpoint("admin/ping");
        match self.client.get(&url).query(&[("wt", "json")]).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                debug!(url = %url, status = %response.status(), "index ping rejected");
                false
            }
            Err(e) => {
                debug!(url = %url, error = %e, "index unreachable");
                false
            }
        }
    }
}

// Error body returned by the index on 4xx/5xx.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    msg: Option<String>,
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .ok()
        .and_then(|env| env.error.msg)
        .unwrap_or(body);
    warn!(status = %status, message = %message, "index returned error status");
    Err(RemoteError::Status { status: status.as_u16(), message })
}
