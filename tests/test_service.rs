//! End-to-end request handling: local store plus remote index.
//!
//! Run with:
//!   cargo test --test test_service

mod common;

use std::path::Path;

use serde_json::{Value, json};
use tempfile::TempDir;

use vocabdeck::config::Config;
use vocabdeck::service::{Request, VocabService};
use vocabdeck::store::{ImportFormat, ListQuery, NewSession, NewVocabulary};

// ── helpers ──────────────────────────────────────────────────────────────────

fn config(data_dir: &Path, base_url: Option<String>) -> Config {
    let mut config = Config::builtin();
    config.data_dir = data_dir.to_path_buf();
    match base_url {
        Some(url) => {
            config.remote.base_url = url;
            config.remote.core = common::CORE.into();
            config.remote.timeout_seconds = Some(5);
        }
        None => config.remote.enabled = false,
    }
    config
}

async fn call(service: &mut VocabService, request: Value) -> Value {
    let request = Request::from_value(request).expect("valid request");
    let envelope = service.handle(request).await.expect("store is open");
    serde_json::to_value(envelope).unwrap()
}

// ── listing ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn listing_prefers_remote_index() {
    let index = common::start(common::sample_docs(25)).await;
    let dir = TempDir::new().unwrap();
    let mut service = VocabService::open(&config(dir.path(), Some(index.base_url()))).await.unwrap();
    assert!(service.facade().is_ready());

    let listed = call(&mut service, json!({"op": "getAllVocabulary", "params": {"limit": 10}})).await;
    assert_eq!(listed["success"], true);
    assert_eq!(listed["data"]["source"], "remote");
    assert_eq!(listed["data"]["vocabulary"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn listing_falls_back_when_remote_empty() {
    let index = common::start(Vec::new()).await;
    let dir = TempDir::new().unwrap();
    let mut service = VocabService::open(&config(dir.path(), Some(index.base_url()))).await.unwrap();
    assert!(service.facade().is_ready());

    let listed = call(&mut service, json!({"op": "getAllVocabulary", "params": {}})).await;
    assert_eq!(listed["data"]["source"], "local");
    // The three seeded sample words.
    assert_eq!(listed["data"]["vocabulary"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn unaligned_offset_is_served_locally() {
    let index = common::start(common::sample_docs(25)).await;
    let dir = TempDir::new().unwrap();
    let mut service = VocabService::open(&config(dir.path(), Some(index.base_url()))).await.unwrap();

    let query = ListQuery { category: None, offset: Some(1), limit: Some(10) };
    let envelope = service.handle(Request::GetAllVocabulary(query)).await.unwrap();
    let data = envelope.data.unwrap();
    assert_eq!(data["source"], "local");
    assert_eq!(data["vocabulary"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn writes_are_mirrored_to_ready_index() {
    let index = common::start(Vec::new()).await;
    let dir = TempDir::new().unwrap();
    let mut service = VocabService::open(&config(dir.path(), Some(index.base_url()))).await.unwrap();

    let added = service
        .handle(Request::AddVocabulary(NewVocabulary::new("window", "cửa sổ").with_category("Home")))
        .await
        .unwrap();
    let id = added.data.unwrap()["id"].as_u64().unwrap();
    assert_eq!(index.len(), 1);

    let remote = call(&mut service, json!({"op": "smartVocabularyById", "params": {"id": id.to_string()}})).await;
    assert_eq!(remote["data"]["english"], "window");
    assert_eq!(remote["data"]["category"], "Home");

    let deleted = call(&mut service, json!({"op": "deleteVocabulary", "params": {"id": id}})).await;
    assert_eq!(deleted["success"], true);
    assert_eq!(index.len(), 0);
}

#[tokio::test]
async fn local_listing_matches_lookup_shape() {
    let dir = TempDir::new().unwrap();
    let mut service = VocabService::open(&config(dir.path(), None)).await.unwrap();

    let recorded = call(&mut service, json!({"op": "recordSession", "params": {"wordId": 1, "correct": true, "responseTimeMs": 900.0}})).await;
    assert_eq!(recorded["success"], true);

    let listed = call(&mut service, json!({"op": "getAllVocabulary"})).await;
    assert_eq!(listed["data"]["source"], "local");
    let words = listed["data"]["vocabulary"].as_array().unwrap();
    let first = words.iter().find(|w| w["id"] == 1).expect("seeded word 1 listed");
    assert!(first["id"].is_u64());
    assert_eq!(first["reviewCount"], 1);
    assert!(first["createdAt"].is_string());
    assert!(first["lastReviewedAt"].is_string());

    let looked_up = call(&mut service, json!({"op": "getVocabularyById", "params": {"id": 1}})).await;
    assert_eq!(&looked_up["data"], first);
}

#[tokio::test]
async fn oversized_page_fails_in_band() {
    let index = common::start(common::sample_docs(25)).await;
    let dir = TempDir::new().unwrap();
    let mut service = VocabService::open(&config(dir.path(), Some(index.base_url()))).await.unwrap();
    assert!(service.facade().is_ready());

    let page = call(
        &mut service,
        json!({"op": "getVocabularyPaginated", "params": {"page": usize::MAX / 2, "size": 10}}),
    )
    .await;
    assert_eq!(page["success"], false);
    assert_eq!(page["error"], "page out of range");

    let listed = call(&mut service, json!({"op": "getAllVocabulary", "params": {"limit": 10}})).await;
    assert_eq!(listed["data"]["source"], "remote");
}

// ── local-only operation ─────────────────────────────────────────────────────

#[tokio::test]
async fn local_operations_without_remote() {
    let dir = TempDir::new().unwrap();
    let mut service = VocabService::open(&config(dir.path(), None)).await.unwrap();
    assert!(!service.facade().is_ready());

    let health = call(&mut service, json!({"op": "health"})).await;
    assert_eq!(health["data"]["store"], true);
    assert_eq!(health["data"]["remote"], false);

    let unavailable = call(&mut service, json!({"op": "getVocabularyPaginated", "params": {"page": 0}})).await;
    assert_eq!(unavailable["success"], false);

    let updated = call(
        &mut service,
        json!({"op": "updateVocabulary", "params": {"id": 1, "patch": {"example": "Hello there!"}}}),
    )
    .await;
    assert_eq!(updated["success"], true);

    let mastery = call(&mut service, json!({"op": "updateMasteryLevel", "params": {"id": 1, "level": 9}})).await;
    assert_eq!(mastery["success"], true);
    let entry = call(&mut service, json!({"op": "getVocabularyById", "params": {"id": 1}})).await;
    assert_eq!(entry["data"]["masteryLevel"], 5);
    assert_eq!(entry["data"]["example"], "Hello there!");

    service
        .handle(Request::RecordSession(NewSession {
            word_id: 1,
            correct: true,
            response_time_ms: 1200.0,
            session_type: None,
        }))
        .await
        .unwrap();
    let stats = call(&mut service, json!({"op": "getWordStatistics", "params": {"wordId": 1}})).await;
    assert_eq!(stats["data"]["totalSessions"], 1);
    assert_eq!(stats["data"]["accuracy"], 1.0);

    let progress = call(&mut service, json!({"op": "getOverallProgress"})).await;
    assert_eq!(progress["data"]["totalWords"], 3);
    assert_eq!(progress["data"]["masteredWords"], 1);

    let setting = call(&mut service, json!({"op": "setSetting", "params": {"key": "dailyGoal", "value": 30}})).await;
    assert_eq!(setting["success"], true);
    let goal = call(&mut service, json!({"op": "getSetting", "params": {"key": "dailyGoal"}})).await;
    assert_eq!(goal["data"], 30);
}

#[tokio::test]
async fn import_reports_valid_records_only() {
    let dir = TempDir::new().unwrap();
    let mut service = VocabService::open(&config(dir.path(), None)).await.unwrap();

    let payload = json!([
        {"english": "one", "vietnamese": "một"},
        {"english": "two", "vietnamese": "hai"},
        {"english": "three", "vietnamese": "ba"},
        {"english": "four"},
        {"english": "five", "vietnamese": ""}
    ])
    .to_string();
    let report = service
        .handle(Request::ImportVocabulary { payload, format: ImportFormat::Json })
        .await
        .unwrap();
    assert_eq!(report.data.unwrap(), json!({"imported": 3, "total": 5}));

    let exported = service
        .handle(Request::ExportVocabulary { format: ImportFormat::Csv, query: ListQuery::default() })
        .await
        .unwrap();
    let csv = exported.data.unwrap();
    assert_eq!(csv.as_str().unwrap().lines().count(), 1 + 6);
}

#[tokio::test]
async fn backup_and_restore_round_trip() {
    let dir = TempDir::new().unwrap();
    let backup = dir.path().join("backups/snapshot.json");
    let mut service = VocabService::open(&config(dir.path(), None)).await.unwrap();

    let done = call(&mut service, json!({"op": "backup", "params": {"destination": backup}})).await;
    assert_eq!(done["success"], true);

    call(&mut service, json!({"op": "deleteVocabulary", "params": {"id": 1}})).await;
    let restored = call(&mut service, json!({"op": "restore", "params": {"source": backup}})).await;
    assert_eq!(restored["success"], true);

    let entry = call(&mut service, json!({"op": "getVocabularyById", "params": {"id": 1}})).await;
    assert_eq!(entry["data"]["english"], "hello");

    let bad = call(&mut service, json!({"op": "restore", "params": {"source": dir.path().join("missing.json")}})).await;
    assert_eq!(bad["success"], false);
}
