//! Record types persisted by the local store, plus the input and
//! statistics shapes exchanged with callers.
//!
//! On-disk and wire field names are camelCase; a vocabulary entry's word
//! class is stored under `"type"`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_WORD_TYPE: &str = "unknown";
pub const DEFAULT_CATEGORY: &str = "general";
pub const DEFAULT_CATEGORY_COLOR: &str = "#3B82F6";
pub const DEFAULT_SESSION_TYPE: &str = "flashcard";
pub const MAX_MASTERY_LEVEL: u8 = 5;
/// Entries at or above this level count as mastered.
pub const MASTERED_LEVEL: u8 = 4;
pub const SCHEMA_VERSION: &str = "1.0.0";

fn default_word_type() -> String { DEFAULT_WORD_TYPE.to_string() }
fn default_category() -> String { DEFAULT_CATEGORY.to_string() }
fn default_color() -> String { DEFAULT_CATEGORY_COLOR.to_string() }
fn default_session_type() -> String { DEFAULT_SESSION_TYPE.to_string() }

// ── Records ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyEntry {
    pub id: u64,
    pub english: String,
    pub vietnamese: String,
    #[serde(rename = "type", default = "default_word_type")]
    pub word_type: String,
    #[serde(default)]
    pub phonetic: String,
    #[serde(default)]
    pub example: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub mastery_level: u8,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

impl VocabularyEntry {
    /// Case-insensitive substring match; `needle` must already be lowercase.
    pub(crate) fn matches(&self, needle: &str) -> bool {
        [&self.english, &self.vietnamese, &self.word_type, &self.example]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_color")]
    pub color: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningSession {
    pub id: u64,
    pub word_id: u64,
    pub correct: bool,
    #[serde(default)]
    pub response_time_ms: f64,
    #[serde(default = "default_session_type")]
    pub session_type: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreMetadata {
    pub version: String,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl StoreMetadata {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { version: SCHEMA_VERSION.to_string(), created: now, last_modified: now }
    }
}

pub type Settings = BTreeMap<String, serde_json::Value>;

// ── Inputs ───────────────────────────────────────────────────────────────────

/// Fields accepted when adding a vocabulary entry. Omitted optional fields
/// take the record defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVocabulary {
    #[serde(default)]
    pub english: String,
    #[serde(default)]
    pub vietnamese: String,
    #[serde(rename = "type", default)]
    pub word_type: Option<String>,
    #[serde(default)]
    pub phonetic: Option<String>,
    #[serde(default)]
    pub example: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub mastery_level: Option<u8>,
}

impl NewVocabulary {
    pub fn new(english: impl Into<String>, vietnamese: impl Into<String>) -> Self {
        Self { english: english.into(), vietnamese: vietnamese.into(), ..Self::default() }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_type(mut self, word_type: impl Into<String>) -> Self {
        self.word_type = Some(word_type.into());
        self
    }

    pub fn with_mastery(mut self, level: u8) -> Self {
        self.mastery_level = Some(level);
        self
    }

    /// Both required fields are present and non-blank.
    pub fn is_valid(&self) -> bool {
        !self.english.trim().is_empty() && !self.vietnamese.trim().is_empty()
    }
}

/// Partial update for a vocabulary entry. `None` leaves a field unchanged;
/// there is deliberately no `id` field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyPatch {
    #[serde(default)]
    pub english: Option<String>,
    #[serde(default)]
    pub vietnamese: Option<String>,
    #[serde(rename = "type", default)]
    pub word_type: Option<String>,
    #[serde(default)]
    pub phonetic: Option<String>,
    #[serde(default)]
    pub example: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub mastery_level: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSession {
    pub word_id: u64,
    pub correct: bool,
    #[serde(default)]
    pub response_time_ms: f64,
    #[serde(default)]
    pub session_type: Option<String>,
}

/// Listing filter: category first, then `offset`, then `limit`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl ListQuery {
    pub fn category(category: impl Into<String>) -> Self {
        Self { category: Some(category.into()), ..Self::default() }
    }
}

// ── Derived values ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordStatistics {
    pub word_id: u64,
    pub total_sessions: usize,
    pub correct_sessions: usize,
    /// `correct / total`, `0.0` when there are no sessions.
    pub accuracy: f64,
    pub average_response_time: f64,
    pub last_session: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallProgress {
    pub total_words: usize,
    pub mastered_words: usize,
    pub total_sessions: usize,
    /// Ratio in `0.0..=1.0`.
    pub overall_accuracy: f64,
    /// `mastered / total` as a ratio in `0.0..=1.0`.
    pub mastery_percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub imported: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportFormat {
    Json,
    Csv,
}

impl ImportFormat {
    /// Guess the format from a file extension; anything but `.csv` is JSON.
    pub fn from_path(path: &std::path::Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => ImportFormat::Csv,
            _ => ImportFormat::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCounts {
    pub vocabulary: usize,
    pub categories: usize,
    pub sessions: usize,
    pub settings: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreInfo {
    pub kind: String,
    pub path: Option<std::path::PathBuf>,
    pub connected: bool,
    pub counts: TableCounts,
    pub metadata: StoreMetadata,
}
