//! `json` store: the whole database in one pretty-printed JSON document.
//!
//! Document layout:
//! ```text
//! {
//!   "vocabulary": [...],
//!   "categories": [...],
//!   "sessions":   [...],
//!   "settings":   { "key": value, ... },
//!   "metadata":   { "version", "created", "lastModified" }
//! }
//! ```
//!
//! Tables live in memory and every mutation rewrites the document: the new
//! content goes to `<file>.tmp`, which is then renamed over the live file.
//! Next-id counters are recomputed on load as `max(id) + 1` per table.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::AppError;

use super::transfer;
use super::types::*;
use super::{Store, StoreKind, StoreOptions};

/// Document as written to disk.
#[derive(Debug, Clone, Serialize)]
struct Document {
    vocabulary: Vec<VocabularyEntry>,
    categories: Vec<Category>,
    sessions: Vec<LearningSession>,
    settings: Settings,
    metadata: StoreMetadata,
}

impl Document {
    fn empty() -> Self {
        Self {
            vocabulary: Vec::new(),
            categories: Vec::new(),
            sessions: Vec::new(),
            settings: Settings::new(),
            metadata: StoreMetadata::new(Utc::now()),
        }
    }
}

/// Document as read from disk; any table may be missing.
#[derive(Debug, Deserialize)]
struct RawDocument {
    vocabulary: Option<Vec<VocabularyEntry>>,
    categories: Option<Vec<Category>>,
    sessions: Option<Vec<LearningSession>>,
    settings: Option<Settings>,
    metadata: Option<StoreMetadata>,
}

impl RawDocument {
    fn is_complete(&self) -> bool {
        self.vocabulary.is_some()
            && self.categories.is_some()
            && self.sessions.is_some()
            && self.settings.is_some()
            && self.metadata.is_some()
    }

    /// Overlay the loaded tables on the empty defaults.
    fn merge_into(self, mut doc: Document) -> Document {
        if let Some(v) = self.vocabulary { doc.vocabulary = v; }
        if let Some(c) = self.categories { doc.categories = c; }
        if let Some(s) = self.sessions { doc.sessions = s; }
        if let Some(s) = self.settings { doc.settings = s; }
        if let Some(m) = self.metadata { doc.metadata = m; }
        doc
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NextIds {
    vocabulary: u64,
    categories: u64,
    sessions: u64,
}

impl NextIds {
    fn from_document(doc: &Document) -> Self {
        fn next(ids: impl Iterator<Item = u64>) -> u64 {
            ids.max().map_or(1, |max| max + 1)
        }
        Self {
            vocabulary: next(doc.vocabulary.iter().map(|v| v.id)),
            categories: next(doc.categories.iter().map(|c| c.id)),
            sessions: next(doc.sessions.iter().map(|s| s.id)),
        }
    }
}

fn ratio(part: usize, total: usize) -> f64 {
    if total == 0 { 0.0 } else { part as f64 / total as f64 }
}

pub struct FileStore {
    path: Option<PathBuf>,
    options: StoreOptions,
    doc: Document,
    next: NextIds,
    connected: bool,
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FileStore {
    pub fn new() -> Self {
        let doc = Document::empty();
        let next = NextIds::from_document(&doc);
        Self { path: None, options: StoreOptions::default(), doc, next, connected: false }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // ── Disk helpers ──────────────────────────────────────────────────

    fn read_document(path: &Path) -> Result<RawDocument, AppError> {
        let data = fs::read_to_string(path)
            .map_err(|e| AppError::Store(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&data)
            .map_err(|e| AppError::Store(format!("malformed {}: {e}", path.display())))
    }

    fn write_document(&mut self) -> Result<(), AppError> {
        let path = self
            .path
            .clone()
            .ok_or_else(|| AppError::Store("store has no location; initialize it first".into()))?;

        let previous = self.doc.metadata.last_modified;
        self.doc.metadata.last_modified = Utc::now();

        let result = (|| {
            let data = if self.options.pretty {
                serde_json::to_string_pretty(&self.doc)
            } else {
                serde_json::to_string(&self.doc)
            }
            .map_err(|e| AppError::Store(format!("serialise document: {e}")))?;

            let mut tmp_path = path.clone().into_os_string();
            tmp_path.push(".tmp");
            let tmp_path = PathBuf::from(tmp_path);

            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)
                .map_err(|e| AppError::Store(format!("cannot write {}: {e}", tmp_path.display())))?;
            file.write_all(data.as_bytes())
                .and_then(|_| file.sync_all())
                .map_err(|e| AppError::Store(format!("write {}: {e}", tmp_path.display())))?;
            fs::rename(&tmp_path, &path)
                .map_err(|e| AppError::Store(format!("cannot replace {}: {e}", path.display())))
        })();

        if result.is_err() {
            self.doc.metadata.last_modified = previous;
        }
        result
    }

    /// Persist after a mutation; failures are logged, never propagated.
    fn save(&mut self, op: &str) -> bool {
        match self.write_document() {
            Ok(()) => true,
            Err(e) => {
                warn!(op, error = %e, "persist failed; in-memory state kept");
                false
            }
        }
    }

    fn load(&mut self, location: &Path) -> Result<(), AppError> {
        if let Some(parent) = location.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| AppError::Store(format!("cannot create {}: {e}", parent.display())))?;
            }
        }

        if !location.exists() {
            info!(path = %location.display(), "no store file; creating empty document");
            self.doc = Document::empty();
            self.next = NextIds::from_document(&self.doc);
            return self.write_document();
        }

        match Self::read_document(location) {
            Ok(raw) => {
                let complete = raw.is_complete();
                self.doc = raw.merge_into(Document::empty());
                self.next = NextIds::from_document(&self.doc);
                info!(
                    path = %location.display(),
                    vocabulary = self.doc.vocabulary.len(),
                    categories = self.doc.categories.len(),
                    sessions = self.doc.sessions.len(),
                    "store loaded"
                );
                if complete { Ok(()) } else { self.write_document() }
            }
            Err(e) => {
                warn!(path = %location.display(), error = %e, "store file unreadable; starting empty");
                if self.options.keep_corrupt_copy {
                    let mut aside = location.as_os_str().to_owned();
                    aside.push(".corrupt");
                    if let Err(copy_err) = fs::copy(location, PathBuf::from(aside)) {
                        warn!(error = %copy_err, "could not keep a copy of the unreadable store file");
                    }
                }
                self.doc = Document::empty();
                self.next = NextIds::from_document(&self.doc);
                self.write_document()
            }
        }
    }

    fn entry_from(&mut self, input: NewVocabulary) -> VocabularyEntry {
        let id = self.next.vocabulary;
        self.next.vocabulary += 1;
        VocabularyEntry {
            id,
            english: input.english,
            vietnamese: input.vietnamese,
            word_type: input.word_type.unwrap_or_else(|| DEFAULT_WORD_TYPE.to_string()),
            phonetic: input.phonetic.unwrap_or_default(),
            example: input.example.unwrap_or_default(),
            category: input.category.unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            mastery_level: input.mastery_level.unwrap_or(0).min(MAX_MASTERY_LEVEL),
            created_at: Utc::now(),
            last_reviewed_at: None,
            review_count: 0,
            last_modified: None,
        }
    }
}

impl Store for FileStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Json
    }

    fn initialize(&mut self, location: &Path, options: &StoreOptions) -> bool {
        self.options = options.clone();
        self.path = Some(location.to_path_buf());
        match self.load(location) {
            Ok(()) => {
                self.connected = true;
                true
            }
            Err(e) => {
                warn!(path = %location.display(), error = %e, "store initialization failed");
                self.connected = false;
                false
            }
        }
    }

    fn close(&mut self) -> bool {
        if !self.connected {
            return true;
        }
        let flushed = self.save("close");
        self.connected = false;
        debug!(flushed, "store closed");
        flushed
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    // ── Vocabulary ────────────────────────────────────────────────────

    fn add_vocabulary(&mut self, input: NewVocabulary) -> u64 {
        let entry = self.entry_from(input);
        let id = entry.id;
        self.doc.vocabulary.push(entry);
        self.save("add_vocabulary");
        debug!(id, "vocabulary added");
        id
    }

    fn get_vocabulary_by_id(&self, id: u64) -> Option<VocabularyEntry> {
        self.doc.vocabulary.iter().find(|v| v.id == id).cloned()
    }

    fn get_all_vocabulary(&self, query: &ListQuery) -> Vec<VocabularyEntry> {
        self.doc
            .vocabulary
            .iter()
            .filter(|v| query.category.as_deref().is_none_or(|c| v.category == c))
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    fn update_vocabulary(&mut self, id: u64, patch: VocabularyPatch) -> bool {
        let Some(entry) = self.doc.vocabulary.iter_mut().find(|v| v.id == id) else {
            return false;
        };
        if let Some(v) = patch.english { entry.english = v; }
        if let Some(v) = patch.vietnamese { entry.vietnamese = v; }
        if let Some(v) = patch.word_type { entry.word_type = v; }
        if let Some(v) = patch.phonetic { entry.phonetic = v; }
        if let Some(v) = patch.example { entry.example = v; }
        if let Some(v) = patch.category { entry.category = v; }
        if let Some(v) = patch.mastery_level { entry.mastery_level = v.min(MAX_MASTERY_LEVEL); }
        entry.last_modified = Some(Utc::now());
        self.save("update_vocabulary")
    }

    fn delete_vocabulary(&mut self, id: u64) -> bool {
        let before = self.doc.vocabulary.len();
        self.doc.vocabulary.retain(|v| v.id != id);
        if self.doc.vocabulary.len() == before {
            return false;
        }
        self.save("delete_vocabulary")
    }

    fn search_vocabulary(&self, text: &str) -> Vec<VocabularyEntry> {
        let needle = text.to_lowercase();
        self.doc.vocabulary.iter().filter(|v| v.matches(&needle)).cloned().collect()
    }

    fn update_mastery_level(&mut self, id: u64, level: u8) -> bool {
        self.update_vocabulary(id, VocabularyPatch { mastery_level: Some(level), ..Default::default() })
    }

    // ── Sessions & statistics ─────────────────────────────────────────

    fn record_session(&mut self, input: NewSession) -> u64 {
        let id = self.next.sessions;
        self.next.sessions += 1;
        let now = Utc::now();
        self.doc.sessions.push(LearningSession {
            id,
            word_id: input.word_id,
            correct: input.correct,
            response_time_ms: input.response_time_ms.max(0.0),
            session_type: input.session_type.unwrap_or_else(|| DEFAULT_SESSION_TYPE.to_string()),
            timestamp: now,
        });
        self.save("record_session");

        // Second step: the session stays recorded even if this one fails.
        if let Some(word) = self.doc.vocabulary.iter_mut().find(|v| v.id == input.word_id) {
            word.review_count += 1;
            word.last_reviewed_at = Some(now);
            self.save("touch_word");
        } else {
            debug!(word_id = input.word_id, "session references unknown word");
        }
        id
    }

    fn get_sessions(&self, word_id: Option<u64>, limit: Option<usize>) -> Vec<LearningSession> {
        self.doc
            .sessions
            .iter()
            .rev()
            .filter(|s| word_id.is_none_or(|w| s.word_id == w))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    fn get_word_statistics(&self, word_id: u64) -> WordStatistics {
        let sessions: Vec<&LearningSession> =
            self.doc.sessions.iter().filter(|s| s.word_id == word_id).collect();
        let total = sessions.len();
        let correct = sessions.iter().filter(|s| s.correct).count();
        let average_response_time = if total == 0 {
            0.0
        } else {
            sessions.iter().map(|s| s.response_time_ms).sum::<f64>() / total as f64
        };
        WordStatistics {
            word_id,
            total_sessions: total,
            correct_sessions: correct,
            accuracy: ratio(correct, total),
            average_response_time,
            last_session: sessions.iter().map(|s| s.timestamp).max(),
        }
    }

    fn get_overall_progress(&self) -> OverallProgress {
        let total_words = self.doc.vocabulary.len();
        let mastered_words =
            self.doc.vocabulary.iter().filter(|v| v.mastery_level >= MASTERED_LEVEL).count();
        let total_sessions = self.doc.sessions.len();
        let correct = self.doc.sessions.iter().filter(|s| s.correct).count();
        OverallProgress {
            total_words,
            mastered_words,
            total_sessions,
            overall_accuracy: ratio(correct, total_sessions),
            mastery_percentage: ratio(mastered_words, total_words),
        }
    }

    // ── Categories ────────────────────────────────────────────────────

    fn add_category(&mut self, input: NewCategory) -> u64 {
        let id = self.next.categories;
        self.next.categories += 1;
        self.doc.categories.push(Category {
            id,
            name: input.name,
            description: input.description,
            color: input.color.unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_string()),
            created_at: Utc::now(),
        });
        self.save("add_category");
        id
    }

    fn get_categories(&self) -> Vec<Category> {
        self.doc.categories.clone()
    }

    fn update_category(&mut self, id: u64, patch: CategoryPatch) -> bool {
        let Some(category) = self.doc.categories.iter_mut().find(|c| c.id == id) else {
            return false;
        };
        if let Some(v) = patch.name { category.name = v; }
        if let Some(v) = patch.description { category.description = Some(v); }
        if let Some(v) = patch.color { category.color = v; }
        self.save("update_category")
    }

    fn delete_category(&mut self, id: u64) -> bool {
        let before = self.doc.categories.len();
        self.doc.categories.retain(|c| c.id != id);
        if self.doc.categories.len() == before {
            return false;
        }
        self.save("delete_category")
    }

    // ── Settings ──────────────────────────────────────────────────────

    fn get_setting(&self, key: &str) -> Option<serde_json::Value> {
        self.doc.settings.get(key).cloned()
    }

    fn set_setting(&mut self, key: &str, value: serde_json::Value) -> bool {
        self.doc.settings.insert(key.to_string(), value);
        self.save("set_setting")
    }

    fn get_all_settings(&self) -> Settings {
        self.doc.settings.clone()
    }

    fn delete_setting(&mut self, key: &str) -> bool {
        if self.doc.settings.remove(key).is_none() {
            return false;
        }
        self.save("delete_setting")
    }

    // ── Maintenance ───────────────────────────────────────────────────

    fn backup(&mut self, destination: &Path) -> bool {
        let Some(path) = self.path.clone() else {
            warn!("backup requested before initialization");
            return false;
        };
        if self.connected && !self.save("backup") {
            return false;
        }
        let result = destination
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|_| fs::copy(&path, destination));
        match result {
            Ok(bytes) => {
                info!(destination = %destination.display(), bytes, "store backed up");
                true
            }
            Err(e) => {
                warn!(destination = %destination.display(), error = %e, "backup failed");
                false
            }
        }
    }

    fn restore(&mut self, source: &Path) -> bool {
        let Some(path) = self.path.clone() else {
            warn!("restore requested before initialization");
            return false;
        };
        if let Err(e) = Self::read_document(source) {
            warn!(source = %source.display(), error = %e, "refusing to restore from unreadable file");
            return false;
        }
        if let Err(e) = fs::copy(source, &path) {
            warn!(source = %source.display(), error = %e, "restore copy failed");
            return false;
        }
        let options = self.options.clone();
        let restored = self.initialize(&path, &options);
        info!(source = %source.display(), restored, "store restored");
        restored
    }

    fn import_vocabulary(&mut self, payload: &str, format: ImportFormat) -> ImportReport {
        let Some(candidates) = transfer::parse_candidates(payload, format) else {
            warn!(?format, "import payload is not valid JSON");
            return ImportReport { imported: 0, total: 0 };
        };
        let total = candidates.len();
        let mut imported = 0;
        for candidate in candidates.into_iter().filter(NewVocabulary::is_valid) {
            let entry = self.entry_from(candidate);
            self.doc.vocabulary.push(entry);
            imported += 1;
        }
        if imported > 0 {
            self.save("import_vocabulary");
        }
        info!(imported, total, "vocabulary import finished");
        ImportReport { imported, total }
    }

    fn export_vocabulary(&self, format: ImportFormat, query: &ListQuery) -> Option<String> {
        let entries = self.get_all_vocabulary(query);
        transfer::render(&entries, format)
            .map_err(|e| warn!(?format, error = %e, "export failed"))
            .ok()
    }

    fn info(&self) -> StoreInfo {
        StoreInfo {
            kind: self.kind().to_string(),
            path: self.path.clone(),
            connected: self.connected,
            counts: TableCounts {
                vocabulary: self.doc.vocabulary.len(),
                categories: self.doc.categories.len(),
                sessions: self.doc.sessions.len(),
                settings: self.doc.settings.len(),
            },
            metadata: self.doc.metadata.clone(),
        }
    }
}
