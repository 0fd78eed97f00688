//! Remote index client and facade against an in-process index.
//!
//! Run with:
//!   cargo test --test test_remote_index

mod common;

use std::time::Duration;

use vocabdeck::facade::{PageRequest, SearchOptions, SearchType, SessionRequest, VocabularyFacade};
use vocabdeck::remote::{Filter, RemoteError, RemoteIndexClient, SearchRequest, VocabularyRecord};

// ── helpers ──────────────────────────────────────────────────────────────────

fn client(index: &common::RunningIndex) -> RemoteIndexClient {
    RemoteIndexClient::new(index.base_url(), common::CORE, Some(Duration::from_secs(5))).unwrap()
}

async fn ready_facade(index: &common::RunningIndex) -> VocabularyFacade {
    let mut facade = VocabularyFacade::new(client(index));
    assert!(facade.initialize().await, "stub index should answer ping");
    facade
}

// ── client ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn search_reports_total_and_start() {
    let index = common::start(common::sample_docs(25)).await;
    let client = client(&index);

    let result = client
        .search_vocabulary(&SearchRequest { rows: 5, start: 20, ..Default::default() })
        .await;
    assert!(result.success);
    assert_eq!(result.total, 25);
    assert_eq!(result.start, 20);
    assert_eq!(result.data.len(), 5);
}

#[tokio::test]
async fn filters_narrow_matches() {
    let index = common::start(common::sample_docs(25)).await;
    let client = client(&index);

    let food = client
        .search(&SearchRequest { filters: vec![Filter::eq("category", "Food")], ..Default::default() })
        .await
        .unwrap();
    assert_eq!(food.total, 12);

    let both = client
        .search(&SearchRequest {
            filters: vec![Filter::any_of("category", ["Food", "Basic"])],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(both.total, 25);
}

#[tokio::test]
async fn lookup_by_id_distinguishes_not_found() {
    let index = common::start(common::sample_docs(3)).await;
    let client = client(&index);

    let doc = client.get_vocabulary_by_id("2").await.unwrap();
    let record = VocabularyRecord::from_document(&doc);
    assert_eq!(record.english, "word2");
    assert_eq!(record.variants["english"], vec!["word2", "alt2"]);

    let err = client.get_vocabulary_by_id("99").await.unwrap_err();
    assert_eq!(err, RemoteError::NotFound("99".into()));
}

#[tokio::test]
async fn random_sampling_stays_in_range() {
    let index = common::start(common::sample_docs(25)).await;
    let client = client(&index);

    for _ in 0..10 {
        let page = client.get_random_vocabulary(5, &[]).await.unwrap();
        assert_eq!(page.docs.len(), 5);
        assert!(page.start < 20);
    }

    // count above total still yields the whole set from offset 0.
    let page = client.get_random_vocabulary(50, &[]).await.unwrap();
    assert_eq!(page.start, 0);
    assert_eq!(page.docs.len(), 25);

    let err = client
        .get_random_vocabulary(5, &[Filter::eq("category", "Nope")])
        .await
        .unwrap_err();
    assert_eq!(err, RemoteError::NoData);
}

#[tokio::test]
async fn upsert_and_delete_commit_immediately() {
    let index = common::start(common::sample_docs(2)).await;
    let client = client(&index);

    let mut record = VocabularyRecord::from_document(&Default::default());
    record.id = "100".into();
    record.english = "lamp".into();
    record.vietnamese = "đèn".into();
    client.add_vocabulary(&record).await.unwrap();
    assert_eq!(index.len(), 3);

    // Upsert replaces by id.
    record.vietnamese = "cái đèn".into();
    client.add_vocabulary(&record).await.unwrap();
    assert_eq!(index.len(), 3);
    let stored = VocabularyRecord::from_document(&client.get_vocabulary_by_id("100").await.unwrap());
    assert_eq!(stored.vietnamese, "cái đèn");

    client.delete_vocabulary("100").await.unwrap();
    assert_eq!(index.len(), 2);
}

#[tokio::test]
async fn statistics_break_down_categories() {
    let index = common::start(common::sample_docs(5)).await;
    let stats = client(&index).get_statistics().await.unwrap();
    assert_eq!(stats.total, 5);
    let basic = stats.categories.iter().find(|c| c.name == "Basic").unwrap();
    let food = stats.categories.iter().find(|c| c.name == "Food").unwrap();
    assert_eq!((basic.count, food.count), (3, 2));
}

#[tokio::test]
async fn failing_ping_means_unavailable() {
    let index = common::start_with(common::sample_docs(1), false).await;
    assert!(!client(&index).is_available().await);

    let mut facade = VocabularyFacade::new(client(&index));
    assert!(!facade.initialize().await);
    assert!(facade.get_statistics().await.is_unavailable());
}

// ── facade ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn pagination_envelope_over_25_documents() {
    let index = common::start(common::sample_docs(25)).await;
    let facade = ready_facade(&index).await;

    let first = facade
        .get_vocabulary_paginated(&PageRequest { page: 0, size: 10, ..Default::default() })
        .await;
    assert!(first.success);
    let first = first.data.unwrap();
    assert_eq!(first.pagination.total, 25);
    assert_eq!(first.pagination.total_pages, 3);
    assert!(first.pagination.has_next);
    assert!(!first.pagination.has_previous);
    assert_eq!(first.records.len(), 10);
    assert_eq!(first.records[0].id, "1");

    let last = facade
        .get_vocabulary_paginated(&PageRequest {
            page: 2,
            size: 10,
            sort: Some("english desc".into()),
            ..Default::default()
        })
        .await
        .data
        .unwrap();
    assert!(!last.pagination.has_next);
    assert!(last.pagination.has_previous);
    assert_eq!(last.records.len(), 5);
    assert_eq!(last.records[0].id, "21");
}

#[tokio::test]
async fn pagination_by_category() {
    let index = common::start(common::sample_docs(25)).await;
    let facade = ready_facade(&index).await;

    let page = facade
        .get_vocabulary_paginated(&PageRequest {
            page: 0,
            size: 5,
            category: Some("Food".into()),
            sort: None,
        })
        .await
        .data
        .unwrap();
    assert_eq!(page.pagination.total, 12);
    assert_eq!(page.pagination.total_pages, 3);
    assert!(page.records.iter().all(|r| r.category == "Food"));
}

#[tokio::test]
async fn page_offset_overflow_is_rejected() {
    let index = common::start(common::sample_docs(25)).await;
    let facade = ready_facade(&index).await;

    let page = facade
        .get_vocabulary_paginated(&PageRequest { page: usize::MAX / 2, size: 10, ..Default::default() })
        .await;
    assert!(!page.success);
    assert!(!page.is_unavailable());
    assert_eq!(page.error.as_deref(), Some("page out of range"));

    let still_served = facade
        .get_vocabulary_paginated(&PageRequest { page: 1, size: 10, ..Default::default() })
        .await;
    assert!(still_served.success);
}

#[tokio::test]
async fn sessions_carry_fresh_ids() {
    let index = common::start(common::sample_docs(25)).await;
    let facade = ready_facade(&index).await;

    let request = SessionRequest { count: 4, ..Default::default() };
    let a = facade.get_vocabulary_session(&request).await.data.unwrap();
    let b = facade.get_vocabulary_session(&request).await.data.unwrap();
    assert_eq!(a.records.len(), 4);
    assert_ne!(a.session_id, b.session_id);
    assert!(uuid::Uuid::parse_str(&a.session_id).is_ok());

    let sequential = facade
        .get_vocabulary_session(&SessionRequest {
            count: 3,
            random: false,
            category: Some("Basic".into()),
            difficulty: None,
        })
        .await
        .data
        .unwrap();
    let ids: Vec<&str> = sequential.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["1", "3", "5"]);

    let empty = facade
        .get_vocabulary_session(&SessionRequest { category: Some("Nope".into()), ..Default::default() })
        .await;
    assert!(!empty.success);
    assert!(!empty.is_unavailable());
}

#[tokio::test]
async fn text_search_by_field() {
    let index = common::start(common::sample_docs(25)).await;
    let facade = ready_facade(&index).await;

    let english = facade
        .search_vocabulary("word1", &SearchOptions { limit: 50, search_type: SearchType::English })
        .await
        .data
        .unwrap();
    // word1, word10..word19
    assert_eq!(english.len(), 11);

    let vietnamese = facade
        .search_vocabulary("từ 2", &SearchOptions { limit: 50, search_type: SearchType::Vietnamese })
        .await
        .data
        .unwrap();
    // từ 2, từ 20..từ 25
    assert_eq!(vietnamese.len(), 7);

    let alt = facade.search_vocabulary("alt4", &SearchOptions::default()).await.data.unwrap();
    assert_eq!(alt.len(), 1);
    assert_eq!(alt[0].english, "word4");

    let capped = facade
        .search_vocabulary("word", &SearchOptions { limit: 3, search_type: SearchType::Both })
        .await
        .data
        .unwrap();
    assert_eq!(capped.len(), 3);
}

#[tokio::test]
async fn facade_pass_throughs() {
    let index = common::start(common::sample_docs(4)).await;
    let facade = ready_facade(&index).await;

    let record = facade.get_vocabulary_by_id("3").await;
    assert_eq!(record.data.unwrap().english, "word3");
    let missing = facade.get_vocabulary_by_id("404").await;
    assert!(!missing.success);
    assert!(missing.error.unwrap().contains("404"));

    let categories = facade.get_categories().await.data.unwrap();
    assert_eq!(categories.len(), 2);

    let mut record = VocabularyRecord::from_document(&Default::default());
    record.id = "9".into();
    record.english = "door".into();
    let added = facade.add_vocabulary(&record).await;
    assert_eq!(added.data.as_deref(), Some("9"));
    assert_eq!(facade.get_statistics().await.data.unwrap().total, 5);
}
