//! Local record store: the capability set every backend provides.
//!
//! A store holds four logical tables (vocabulary, categories, sessions,
//! settings) plus document metadata. Operations never fail outward: I/O and
//! parse problems are logged and surface as `false`, `None`, an empty
//! collection or a zeroed report. In-memory state stays authoritative when a
//! persist fails and is flushed again by the next successful write.
//!
//! Backends are selected by [`StoreKind`]; only [`StoreKind::Json`] is
//! implemented ([`file::FileStore`]).

pub mod file;
pub mod transfer;
pub mod types;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub use file::FileStore;
pub use types::{
    Category, CategoryPatch, ImportFormat, ImportReport, LearningSession, ListQuery, NewCategory,
    NewSession, NewVocabulary, OverallProgress, Settings, StoreInfo, StoreMetadata,
    VocabularyEntry, VocabularyPatch, WordStatistics,
};

/// Backend tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Single pretty-printed JSON document.
    Json,
    /// Reserved for an embedded SQL backend; not implemented.
    Sqlite,
}

impl StoreKind {
    /// File name used when no explicit location is configured.
    pub fn default_file_name(self) -> &'static str {
        match self {
            StoreKind::Json => "vocabulary.json",
            StoreKind::Sqlite => "vocabulary.db",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StoreKind::Json => "json",
            StoreKind::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" | "file" => Ok(StoreKind::Json),
            "sqlite" => Ok(StoreKind::Sqlite),
            other => Err(AppError::Config(format!("unknown store kind: '{other}'"))),
        }
    }
}

/// Options recognised by [`Store::initialize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// Pretty-print the document on disk.
    pub pretty: bool,
    /// Copy an unparsable file to `<file>.corrupt` before starting fresh.
    pub keep_corrupt_copy: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self { pretty: true, keep_corrupt_copy: true }
    }
}

/// Pluggable local store.
///
/// Every mutating call rewrites the whole backing document before it
/// returns. Callers hold the store exclusively (`&mut self`), so two
/// mutations never interleave.
pub trait Store: Send {
    fn kind(&self) -> StoreKind;

    /// Open or create the store at `location`. Returns `false` on failure.
    fn initialize(&mut self, location: &Path, options: &StoreOptions) -> bool;

    /// Flush state to disk and mark the store disconnected.
    fn close(&mut self) -> bool;

    fn is_connected(&self) -> bool;

    // ── Vocabulary ────────────────────────────────────────────────────

    /// Insert a new entry and return its id (`max + 1`, never reused).
    fn add_vocabulary(&mut self, input: NewVocabulary) -> u64;

    fn get_vocabulary_by_id(&self, id: u64) -> Option<VocabularyEntry>;

    fn get_all_vocabulary(&self, query: &ListQuery) -> Vec<VocabularyEntry>;

    /// Merge `patch` over entry `id`. `false` when `id` does not exist.
    fn update_vocabulary(&mut self, id: u64, patch: VocabularyPatch) -> bool;

    fn delete_vocabulary(&mut self, id: u64) -> bool;

    /// Case-insensitive substring search over english, vietnamese, type and example.
    fn search_vocabulary(&self, text: &str) -> Vec<VocabularyEntry>;

    /// Set an entry's mastery level, clamped to `0..=5`.
    fn update_mastery_level(&mut self, id: u64, level: u8) -> bool;

    // ── Sessions & statistics ─────────────────────────────────────────

    /// Append a session and touch the referenced word when it exists.
    fn record_session(&mut self, input: NewSession) -> u64;

    /// Sessions newest first, optionally for one word and capped at `limit`.
    fn get_sessions(&self, word_id: Option<u64>, limit: Option<usize>) -> Vec<LearningSession>;

    fn get_word_statistics(&self, word_id: u64) -> WordStatistics;

    fn get_overall_progress(&self) -> OverallProgress;

    // ── Categories ────────────────────────────────────────────────────

    fn add_category(&mut self, input: NewCategory) -> u64;

    fn get_categories(&self) -> Vec<Category>;

    fn update_category(&mut self, id: u64, patch: CategoryPatch) -> bool;

    fn delete_category(&mut self, id: u64) -> bool;

    // ── Settings ──────────────────────────────────────────────────────

    fn get_setting(&self, key: &str) -> Option<serde_json::Value>;

    fn set_setting(&mut self, key: &str, value: serde_json::Value) -> bool;

    fn get_all_settings(&self) -> Settings;

    fn delete_setting(&mut self, key: &str) -> bool;

    // ── Maintenance ───────────────────────────────────────────────────

    fn backup(&mut self, destination: &Path) -> bool;

    /// Replace the live document with `source` and reload from it.
    fn restore(&mut self, source: &Path) -> bool;

    fn import_vocabulary(&mut self, payload: &str, format: ImportFormat) -> ImportReport;

    fn export_vocabulary(&self, format: ImportFormat, query: &ListQuery) -> Option<String>;

    fn info(&self) -> StoreInfo;
}
