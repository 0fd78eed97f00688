//! Vocabulary access facade over the remote index.
//!
//! The facade probes the index once in [`VocabularyFacade::initialize`] and
//! from then on either serves from it or answers every call with
//! [`Envelope::unavailable`]. Nothing here returns an error to the caller;
//! all outcomes are in-band.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::envelope::Envelope;
use crate::remote::{
    CategoryCount, Filter, IndexStatistics, RemoteError, RemoteIndexClient, SearchPage,
    SearchRequest, VocabularyRecord,
};

/// Sort applied to every paginated read. Word fields may be multi-valued in
/// the index, so sorting on them is not stable.
const PAGE_SORT: &str = "id asc";

// ── Requests ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageRequest {
    /// 0-based.
    pub page: usize,
    pub size: usize,
    pub category: Option<String>,
    /// Accepted for compatibility; the index is always read in id order.
    pub sort: Option<String>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 0, size: 20, category: None, sort: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionRequest {
    pub count: usize,
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub random: bool,
}

impl Default for SessionRequest {
    fn default() -> Self {
        Self { count: 10, category: None, difficulty: None, random: true }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    English,
    Vietnamese,
    #[default]
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchOptions {
    pub limit: usize,
    pub search_type: SearchType,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { limit: 20, search_type: SearchType::Both }
    }
}

// ── Responses ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: usize,
    pub size: usize,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl Pagination {
    pub fn new(page: usize, size: usize, total: u64) -> Self {
        let total_pages = if size == 0 { 0 } else { total.div_ceil(size as u64) };
        Self {
            page,
            size,
            total,
            total_pages,
            has_next: (page as u64).saturating_add(1) < total_pages,
            has_previous: page > 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyPage {
    pub records: Vec<VocabularyRecord>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularySession {
    /// Opaque correlation id; never persisted.
    pub session_id: String,
    pub records: Vec<VocabularyRecord>,
    pub total: u64,
}

// ── Facade ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct VocabularyFacade {
    client: Option<RemoteIndexClient>,
    ready: bool,
}

impl VocabularyFacade {
    pub fn new(client: RemoteIndexClient) -> Self {
        Self { client: Some(client), ready: false }
    }

    /// A facade with no index behind it; never becomes ready.
    pub fn disabled() -> Self {
        Self { client: None, ready: false }
    }

    /// Probe the index once and remember the outcome.
    pub async fn initialize(&mut self) -> bool {
        self.ready = match &self.client {
            Some(client) => client.is_available().await,
            None => false,
        };
        match (&self.client, self.ready) {
            (Some(client), true) => info!(url = %client.base_url(), "remote index ready"),
            (Some(client), false) => {
                warn!(url = %client.base_url(), "remote index unreachable; using local store only")
            }
            (None, _) => debug!("remote index disabled"),
        }
        self.ready
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    fn client(&self) -> Option<&RemoteIndexClient> {
        self.client.as_ref().filter(|_| self.ready)
    }

    pub async fn get_vocabulary_paginated(&self, request: &PageRequest) -> Envelope<VocabularyPage> {
        let Some(client) = self.client() else {
            return Envelope::unavailable();
        };
        if request.size == 0 {
            return Envelope::failed("page size must be positive");
        }
        let Some(start) = request.page.checked_mul(request.size) else {
            return Envelope::failed("page out of range");
        };
        if let Some(sort) = request.sort.as_deref().filter(|s| *s != PAGE_SORT) {
            debug!(requested = sort, "ignoring requested sort; index pages are read in id order");
        }
        let search = SearchRequest {
            rows: request.size,
            start,
            sort: Some(PAGE_SORT.to_string()),
            filters: request.category.iter().map(|c| Filter::eq("category", c)).collect(),
            ..Default::default()
        };
        match client.search(&search).await {
            Ok(page) => Envelope::ok(VocabularyPage {
                pagination: Pagination::new(request.page, request.size, page.total),
                records: normalize(&page),
            }),
            Err(e) => Envelope::failed(e.to_string()),
        }
    }

    pub async fn get_vocabulary_session(&self, request: &SessionRequest) -> Envelope<VocabularySession> {
        let Some(client) = self.client() else {
            return Envelope::unavailable();
        };
        let mut filters: Vec<Filter> =
            request.category.iter().map(|c| Filter::eq("category", c)).collect();
        filters.extend(request.difficulty.iter().map(|d| Filter::eq("difficulty", d)));

        let result = if request.random {
            client.get_random_vocabulary(request.count, &filters).await
        } else {
            let search = SearchRequest {
                rows: request.count,
                sort: Some(PAGE_SORT.to_string()),
                filters,
                ..Default::default()
            };
            client.search(&search).await
        };
        match result {
            Ok(page) => Envelope::ok(VocabularySession {
                session_id: Uuid::new_v4().to_string(),
                records: normalize(&page),
                total: page.total,
            }),
            Err(e) => Envelope::failed(e.to_string()),
        }
    }

    pub async fn search_vocabulary(
        &self,
        text: &str,
        options: &SearchOptions,
    ) -> Envelope<Vec<VocabularyRecord>> {
        let Some(client) = self.client() else {
            return Envelope::unavailable();
        };
        if text.trim().is_empty() {
            return Envelope::ok(Vec::new());
        }
        let search = SearchRequest {
            query: text_query(text, options.search_type),
            rows: options.limit,
            ..Default::default()
        };
        match client.search(&search).await {
            Ok(page) => Envelope::ok(normalize(&page)),
            Err(e) => Envelope::failed(e.to_string()),
        }
    }

    pub async fn get_vocabulary_by_id(&self, id: &str) -> Envelope<VocabularyRecord> {
        let Some(client) = self.client() else {
            return Envelope::unavailable();
        };
        match client.get_vocabulary_by_id(id).await {
            Ok(doc) => Envelope::ok(VocabularyRecord::from_document(&doc)),
            Err(e @ RemoteError::NotFound(_)) => Envelope::failed(e.to_string()),
            Err(e) => {
                warn!(id, error = %e, "index lookup failed");
                Envelope::failed(e.to_string())
            }
        }
    }

    pub async fn get_categories(&self) -> Envelope<Vec<CategoryCount>> {
        self.get_statistics().await.map(|stats| stats.categories)
    }

    /// Upsert `record` into the index. Returns the record id.
    pub async fn add_vocabulary(&self, record: &VocabularyRecord) -> Envelope<String> {
        let Some(client) = self.client() else {
            return Envelope::unavailable();
        };
        match client.add_vocabulary(record).await {
            Ok(()) => Envelope::ok(record.id.clone()),
            Err(e) => Envelope::failed(e.to_string()),
        }
    }

    pub async fn delete_vocabulary(&self, id: &str) -> Envelope<bool> {
        let Some(client) = self.client() else {
            return Envelope::unavailable();
        };
        match client.delete_vocabulary(id).await {
            Ok(()) => Envelope::ok(true),
            Err(e) => Envelope::failed(e.to_string()),
        }
    }

    pub async fn get_statistics(&self) -> Envelope<IndexStatistics> {
        let Some(client) = self.client() else {
            return Envelope::unavailable();
        };
        match client.get_statistics().await {
            Ok(stats) => Envelope::ok(stats),
            Err(e) => Envelope::failed(e.to_string()),
        }
    }
}

fn normalize(page: &SearchPage) -> Vec<VocabularyRecord> {
    page.docs.iter().map(VocabularyRecord::from_document).collect()
}

/// Backslash-escape every character the index query parser treats as syntax.
pub fn escape_query(text: &str) -> String {
    const SPECIAL: &[char] = &[
        '+', '-', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':', '\\',
        '/', ' ',
    ];
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if SPECIAL.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Substring match on the selected field(s).
pub fn text_query(text: &str, search_type: SearchType) -> String {
    let term = escape_query(text.trim());
    match search_type {
        SearchType::English => format!("english:*{term}*"),
        SearchType::Vietnamese => format!("vietnamese:*{term}*"),
        SearchType::Both => format!("english:*{term}* OR vietnamese:*{term}*"),
    }
}
