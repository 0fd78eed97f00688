//! Store manager: owns the one active local store for the process.
//!
//! The manager picks the backend for a [`StoreKind`], resolves its location,
//! initialises it and seeds starter data into empty tables. It is held by
//! the composition root ([`crate::service::VocabService`]) and handed out by
//! reference; there is no process-wide global.
//!
//! ```text
//! Uninitialized ──initialize──▶ Initializing ──ok──▶ Ready ──close──▶ Closed
//!                                     └──err──▶ Failed
//! ```
//! `Failed` and `Closed` behave like `Uninitialized`: `store()` errors and a
//! new `initialize` call starts from scratch.

use std::path::PathBuf;

use serde_json::json;
use tracing::{info, warn};

use crate::config::default_data_dir;
use crate::error::AppError;
use crate::store::{FileStore, NewCategory, NewVocabulary, Store, StoreKind, StoreOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
    Closed,
}

/// Options for [`StoreManager::initialize`].
#[derive(Debug, Clone)]
pub struct ManagerOptions {
    /// Explicit store file. Wins over `data_dir`.
    pub path: Option<PathBuf>,
    /// Directory for the kind's default file name. Defaults to the per-user
    /// application data directory.
    pub data_dir: Option<PathBuf>,
    /// Seed starter categories, words and settings into empty tables.
    pub seed_defaults: bool,
    pub store: StoreOptions,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self { path: None, data_dir: None, seed_defaults: true, store: StoreOptions::default() }
    }
}

impl ManagerOptions {
    fn resolve_path(&self, kind: StoreKind) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            self.data_dir.clone().unwrap_or_else(default_data_dir).join(kind.default_file_name())
        })
    }
}

/// (name, description, color)
const STARTER_CATEGORIES: [(&str, &str, &str); 5] = [
    ("General", "Everyday words", "#3B82F6"),
    ("Basic", "First words and greetings", "#10B981"),
    ("Business", "Work and office vocabulary", "#F59E0B"),
    ("Travel", "Getting around", "#8B5CF6"),
    ("Food", "Eating and drinking", "#EF4444"),
];

/// (english, vietnamese, type, phonetic, example)
const SAMPLE_WORDS: [(&str, &str, &str, &str, &str); 3] = [
    ("hello", "xin chào", "interjection", "/həˈloʊ/", "Hello, how are you?"),
    ("thank you", "cảm ơn", "phrase", "/θæŋk juː/", "Thank you for your help."),
    ("goodbye", "tạm biệt", "interjection", "/ˌɡʊdˈbaɪ/", "Goodbye, see you tomorrow."),
];

pub struct StoreManager {
    state: ManagerState,
    store: Option<Box<dyn Store>>,
}

impl Default for StoreManager {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreManager {
    pub fn new() -> Self {
        Self { state: ManagerState::Uninitialized, store: None }
    }

    pub fn state(&self) -> ManagerState {
        self.state
    }

    /// Build, open and seed the store for `kind`.
    ///
    /// Calling this while `Ready` closes the current store first.
    pub fn initialize(&mut self, kind: StoreKind, options: ManagerOptions) -> Result<(), AppError> {
        if self.state == ManagerState::Ready {
            self.close();
        }
        self.state = ManagerState::Initializing;

        let mut store = match build_store(kind) {
            Ok(store) => store,
            Err(e) => {
                self.state = ManagerState::Failed;
                return Err(e);
            }
        };

        let path = options.resolve_path(kind);
        if !store.initialize(&path, &options.store) {
            self.state = ManagerState::Failed;
            return Err(AppError::Store(format!("cannot open {} store at {}", kind, path.display())));
        }

        if options.seed_defaults {
            seed_defaults(store.as_mut());
        }

        info!(kind = %kind, path = %path.display(), "store ready");
        self.store = Some(store);
        self.state = ManagerState::Ready;
        Ok(())
    }

    /// The active store, or [`AppError::NotInitialized`].
    pub fn store(&self) -> Result<&dyn Store, AppError> {
        match &self.store {
            Some(store) => Ok(store.as_ref()),
            None => Err(AppError::NotInitialized),
        }
    }

    pub fn store_mut(&mut self) -> Result<&mut dyn Store, AppError> {
        match &mut self.store {
            Some(store) => Ok(store.as_mut()),
            None => Err(AppError::NotInitialized),
        }
    }

    /// Close the active store and forget it. Returns whether the final flush
    /// succeeded (`true` when nothing was open).
    pub fn close(&mut self) -> bool {
        let flushed = match self.store.take() {
            Some(mut store) => store.close(),
            None => true,
        };
        if self.state != ManagerState::Uninitialized {
            self.state = ManagerState::Closed;
        }
        flushed
    }

    pub fn is_healthy(&self) -> bool {
        self.state == ManagerState::Ready && self.store.as_ref().is_some_and(|s| s.is_connected())
    }
}

fn build_store(kind: StoreKind) -> Result<Box<dyn Store>, AppError> {
    match kind {
        StoreKind::Json => Ok(Box::new(FileStore::new())),
        StoreKind::Sqlite => Err(AppError::Unsupported(format!(
            "store kind '{kind}' is not implemented; use 'json'"
        ))),
    }
}

/// Seed each table only when it is empty, so re-runs never duplicate.
fn seed_defaults(store: &mut dyn Store) {
    if store.get_categories().is_empty() {
        for (name, description, color) in STARTER_CATEGORIES {
            store.add_category(NewCategory {
                name: name.to_string(),
                description: Some(description.to_string()),
                color: Some(color.to_string()),
            });
        }
        info!(count = STARTER_CATEGORIES.len(), "seeded starter categories");
    }

    if store.get_all_vocabulary(&Default::default()).is_empty() {
        for (english, vietnamese, word_type, phonetic, example) in SAMPLE_WORDS {
            store.add_vocabulary(NewVocabulary {
                phonetic: Some(phonetic.to_string()),
                example: Some(example.to_string()),
                ..NewVocabulary::new(english, vietnamese).with_type(word_type).with_category("Basic")
            });
        }
        info!(count = SAMPLE_WORDS.len(), "seeded sample vocabulary");
    }

    if store.get_all_settings().is_empty() {
        let defaults = [
            ("theme", json!("light")),
            ("dailyGoal", json!(20)),
            ("autoFlip", json!(false)),
            ("showPhonetic", json!(true)),
        ];
        for (key, value) in defaults {
            if !store.set_setting(key, value) {
                warn!(key, "default setting not persisted");
            }
        }
        info!("seeded default settings");
    }
}
