//! Composition root and caller-facing request contract.
//!
//! [`VocabService`] owns the [`StoreManager`] and the [`VocabularyFacade`]
//! and answers [`Request`]s with an [`Envelope`]. Every outcome is in-band
//! except [`AppError::NotInitialized`], which means the store was never
//! opened (or was closed) and is returned as `Err`.
//!
//! Wire shape, one request per JSON object:
//! ```text
//! {"op": "getVocabularyById", "params": {"id": 3}}
//! {"op": "getCategories"}
//! {"op": "getAllVocabulary"}
//! ```
//!
//! [`Request::from_value`] (and `str::parse`) read a missing `params` as
//! `{}`, so ops whose parameters all have defaults may omit it. Plain
//! `serde_json::from_str::<Request>` still requires `params` for those ops.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::config::Config;
use crate::envelope::Envelope;
use crate::error::AppError;
use crate::facade::{PageRequest, SearchOptions, SessionRequest, VocabularyFacade};
use crate::manager::{ManagerOptions, StoreManager};
use crate::remote::{RemoteIndexClient, VocabularyRecord};
use crate::store::{
    CategoryPatch, ImportFormat, ListQuery, NewCategory, NewSession, NewVocabulary, Store,
    StoreOptions, VocabularyPatch,
};

/// Page size used when a listing has no explicit limit.
const DEFAULT_LIST_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "params", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Request {
    // Local store
    GetAllVocabulary(ListQuery),
    GetVocabularyById { id: u64 },
    AddVocabulary(NewVocabulary),
    UpdateVocabulary { id: u64, patch: VocabularyPatch },
    DeleteVocabulary { id: u64 },
    SearchVocabulary { query: String },
    UpdateMasteryLevel { id: u64, level: u8 },
    RecordSession(NewSession),
    GetSessions {
        #[serde(default)]
        word_id: Option<u64>,
        #[serde(default)]
        limit: Option<usize>,
    },
    GetWordStatistics { word_id: u64 },
    GetOverallProgress,
    GetCategories,
    AddCategory(NewCategory),
    UpdateCategory { id: u64, patch: CategoryPatch },
    DeleteCategory { id: u64 },
    GetSetting { key: String },
    SetSetting { key: String, value: Value },
    GetAllSettings,
    DeleteSetting { key: String },
    Backup { destination: PathBuf },
    Restore { source: PathBuf },
    ImportVocabulary { payload: String, format: ImportFormat },
    ExportVocabulary {
        format: ImportFormat,
        #[serde(default)]
        query: ListQuery,
    },
    StoreInfo,

    // Remote index
    GetVocabularyPaginated(PageRequest),
    GetVocabularySession(SessionRequest),
    SmartSearch {
        text: String,
        #[serde(default)]
        options: SearchOptions,
    },
    SmartVocabularyById { id: String },
    GetIndexCategories,
    GetIndexStatistics,

    Health,
}

impl Request {
    /// Decode one request object, treating a missing `params` as `{}`.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let bare = value.as_object().is_some_and(|object| !object.contains_key("params"));
        match serde_json::from_value(value.clone()) {
            Err(_) if bare => {
                let mut value = value;
                value["params"] = json!({});
                serde_json::from_value(value)
            }
            parsed => parsed,
        }
    }

    /// Operation name as it appears on the wire.
    pub fn op(&self) -> &'static str {
        match self {
            Request::GetAllVocabulary(_) => "getAllVocabulary",
            Request::GetVocabularyById { .. } => "getVocabularyById",
            Request::AddVocabulary(_) => "addVocabulary",
            Request::UpdateVocabulary { .. } => "updateVocabulary",
            Request::DeleteVocabulary { .. } => "deleteVocabulary",
            Request::SearchVocabulary { .. } => "searchVocabulary",
            Request::UpdateMasteryLevel { .. } => "updateMasteryLevel",
            Request::RecordSession(_) => "recordSession",
            Request::GetSessions { .. } => "getSessions",
            Request::GetWordStatistics { .. } => "getWordStatistics",
            Request::GetOverallProgress => "getOverallProgress",
            Request::GetCategories => "getCategories",
            Request::AddCategory(_) => "addCategory",
            Request::UpdateCategory { .. } => "updateCategory",
            Request::DeleteCategory { .. } => "deleteCategory",
            Request::GetSetting { .. } => "getSetting",
            Request::SetSetting { .. } => "setSetting",
            Request::GetAllSettings => "getAllSettings",
            Request::DeleteSetting { .. } => "deleteSetting",
            Request::Backup { .. } => "backup",
            Request::Restore { .. } => "restore",
            Request::ImportVocabulary { .. } => "importVocabulary",
            Request::ExportVocabulary { .. } => "exportVocabulary",
            Request::StoreInfo => "storeInfo",
            Request::GetVocabularyPaginated(_) => "getVocabularyPaginated",
            Request::GetVocabularySession(_) => "getVocabularySession",
            Request::SmartSearch { .. } => "smartSearch",
            Request::SmartVocabularyById { .. } => "smartVocabularyById",
            Request::GetIndexCategories => "getIndexCategories",
            Request::GetIndexStatistics => "getIndexStatistics",
            Request::Health => "health",
        }
    }
}

impl FromStr for Request {
    type Err = serde_json::Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        Self::from_value(serde_json::from_str(line)?)
    }
}

/// Where a listing was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Remote,
    Local,
}

pub struct VocabService {
    manager: StoreManager,
    facade: VocabularyFacade,
}

impl VocabService {
    pub fn new(manager: StoreManager, facade: VocabularyFacade) -> Self {
        Self { manager, facade }
    }

    /// Open the configured store and probe the remote index.
    ///
    /// A store that cannot be opened is an error; an unreachable index is not.
    pub async fn open(config: &Config) -> Result<Self, AppError> {
        let mut manager = StoreManager::new();
        manager.initialize(
            config.store.kind,
            ManagerOptions {
                path: config.store.path.clone(),
                data_dir: Some(config.data_dir.clone()),
                seed_defaults: config.store.seed_defaults,
                store: StoreOptions::default(),
            },
        )?;

        let mut facade = if config.remote.enabled {
            let client = RemoteIndexClient::from_config(&config.remote)
                .map_err(|e| AppError::Remote(e.to_string()))?;
            VocabularyFacade::new(client)
        } else {
            VocabularyFacade::disabled()
        };
        facade.initialize().await;

        Ok(Self::new(manager, facade))
    }

    pub fn manager(&self) -> &StoreManager {
        &self.manager
    }

    pub fn facade(&self) -> &VocabularyFacade {
        &self.facade
    }

    pub fn close(&mut self) -> bool {
        self.manager.close()
    }

    fn store(&self) -> Result<&dyn Store, AppError> {
        self.manager.store()
    }

    fn store_mut(&mut self) -> Result<&mut dyn Store, AppError> {
        self.manager.store_mut()
    }

    pub async fn handle(&mut self, request: Request) -> Result<Envelope<Value>, AppError> {
        debug!(op = request.op(), "handling request");
        let envelope = match request {
            Request::GetAllVocabulary(query) => self.list_vocabulary(&query).await?,
            Request::GetVocabularyById { id } => {
                Envelope::ok(self.store()?.get_vocabulary_by_id(id)).into_json()
            }
            Request::AddVocabulary(input) => self.add_vocabulary(input).await?,
            Request::UpdateVocabulary { id, patch } => {
                let done = self.store_mut()?.update_vocabulary(id, patch);
                flag(done, || format!("vocabulary {id} was not updated"))
            }
            Request::DeleteVocabulary { id } => self.delete_vocabulary(id).await?,
            Request::SearchVocabulary { query } => {
                Envelope::ok(self.store()?.search_vocabulary(&query)).into_json()
            }
            Request::UpdateMasteryLevel { id, level } => {
                let done = self.store_mut()?.update_mastery_level(id, level);
                flag(done, || format!("mastery of vocabulary {id} was not updated"))
            }
            Request::RecordSession(input) => {
                Envelope::ok(json!({ "id": self.store_mut()?.record_session(input) }))
            }
            Request::GetSessions { word_id, limit } => {
                Envelope::ok(self.store()?.get_sessions(word_id, limit)).into_json()
            }
            Request::GetWordStatistics { word_id } => {
                Envelope::ok(self.store()?.get_word_statistics(word_id)).into_json()
            }
            Request::GetOverallProgress => {
                Envelope::ok(self.store()?.get_overall_progress()).into_json()
            }
            Request::GetCategories => Envelope::ok(self.store()?.get_categories()).into_json(),
            Request::AddCategory(input) => {
                if input.name.trim().is_empty() {
                    Envelope::failed("category name is required")
                } else {
                    Envelope::ok(json!({ "id": self.store_mut()?.add_category(input) }))
                }
            }
            Request::UpdateCategory { id, patch } => {
                let done = self.store_mut()?.update_category(id, patch);
                flag(done, || format!("category {id} was not updated"))
            }
            Request::DeleteCategory { id } => {
                let done = self.store_mut()?.delete_category(id);
                flag(done, || format!("category {id} was not deleted"))
            }
            Request::GetSetting { key } => Envelope::ok(self.store()?.get_setting(&key)).into_json(),
            Request::SetSetting { key, value } => {
                let done = self.store_mut()?.set_setting(&key, value);
                flag(done, || format!("setting '{key}' was not saved"))
            }
            Request::GetAllSettings => Envelope::ok(self.store()?.get_all_settings()).into_json(),
            Request::DeleteSetting { key } => {
                let done = self.store_mut()?.delete_setting(&key);
                flag(done, || format!("setting '{key}' was not deleted"))
            }
            Request::Backup { destination } => {
                let done = self.store_mut()?.backup(&destination);
                flag(done, || format!("backup to {} failed", destination.display()))
            }
            Request::Restore { source } => {
                let done = self.store_mut()?.restore(&source);
                flag(done, || format!("restore from {} failed", source.display()))
            }
            Request::ImportVocabulary { payload, format } => {
                Envelope::ok(self.store_mut()?.import_vocabulary(&payload, format)).into_json()
            }
            Request::ExportVocabulary { format, query } => {
                match self.store()?.export_vocabulary(format, &query) {
                    Some(text) => Envelope::ok(Value::String(text)),
                    None => Envelope::failed("export failed"),
                }
            }
            Request::StoreInfo => Envelope::ok(self.store()?.info()).into_json(),

            Request::GetVocabularyPaginated(page) => {
                self.facade.get_vocabulary_paginated(&page).await.into_json()
            }
            Request::GetVocabularySession(session) => {
                self.facade.get_vocabulary_session(&session).await.into_json()
            }
            Request::SmartSearch { text, options } => {
                self.facade.search_vocabulary(&text, &options).await.into_json()
            }
            Request::SmartVocabularyById { id } => {
                self.facade.get_vocabulary_by_id(&id).await.into_json()
            }
            Request::GetIndexCategories => self.facade.get_categories().await.into_json(),
            Request::GetIndexStatistics => self.facade.get_statistics().await.into_json(),

            Request::Health => Envelope::ok(json!({
                "store": self.manager.is_healthy(),
                "storeState": format!("{:?}", self.manager.state()),
                "remote": self.facade.is_ready(),
            })),
        };
        Ok(envelope)
    }

    /// List vocabulary from the remote index when it can serve the window,
    /// otherwise from the local store.
    ///
    /// The index is read in pages, so only offsets aligned to the limit are
    /// served remotely. An empty or failed remote read falls back to local.
    /// Remote pages hold normalised index records; local results are the
    /// stored entries, with numeric ids and review metadata.
    pub async fn list_vocabulary(&self, query: &ListQuery) -> Result<Envelope<Value>, AppError> {
        self.store()?;
        let size = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
        let offset = query.offset.unwrap_or(0);

        if self.facade.is_ready() && size > 0 && offset % size == 0 {
            let page = PageRequest {
                page: offset / size,
                size,
                category: query.category.clone(),
                sort: None,
            };
            let remote = self.facade.get_vocabulary_paginated(&page).await;
            match remote.data {
                Some(page) if remote.success && !page.records.is_empty() => {
                    return Ok(listing(Source::Remote, &page.records));
                }
                _ => debug!(error = ?remote.error, "remote listing empty; using local store"),
            }
        }

        let entries = self.store()?.get_all_vocabulary(query);
        Ok(listing(Source::Local, &entries))
    }

    async fn add_vocabulary(&mut self, input: NewVocabulary) -> Result<Envelope<Value>, AppError> {
        if !input.is_valid() {
            return Ok(Envelope::failed("english and vietnamese are required"));
        }
        let store = self.store_mut()?;
        let id = store.add_vocabulary(input);
        let entry = store.get_vocabulary_by_id(id);

        if let Some(entry) = entry.filter(|_| self.facade.is_ready()) {
            let mirrored = self.facade.add_vocabulary(&VocabularyRecord::from(&entry)).await;
            if !mirrored.success {
                warn!(id, error = ?mirrored.error, "vocabulary not mirrored to remote index");
            }
        }
        Ok(Envelope::ok(json!({ "id": id })))
    }

    async fn delete_vocabulary(&mut self, id: u64) -> Result<Envelope<Value>, AppError> {
        let done = self.store_mut()?.delete_vocabulary(id);
        if done && self.facade.is_ready() {
            let removed = self.facade.delete_vocabulary(&id.to_string()).await;
            if !removed.success {
                warn!(id, error = ?removed.error, "vocabulary not removed from remote index");
            }
        }
        Ok(flag(done, || format!("vocabulary {id} was not deleted")))
    }
}

fn listing<T: Serialize>(source: Source, items: &[T]) -> Envelope<Value> {
    Envelope::ok(json!({ "source": source, "vocabulary": items }))
}

fn flag(done: bool, message: impl FnOnce() -> String) -> Envelope<Value> {
    if done {
        Envelope::ok(Value::Bool(true))
    } else {
        Envelope { success: false, data: Some(Value::Bool(false)), error: Some(message()) }
    }
}
