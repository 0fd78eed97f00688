//! In-process stand-in for the remote search index.
//!
//! Serves `/solr/vocabulary/{select,update,admin/ping}` from an in-memory
//! document list on an ephemeral port. Query support is limited to what
//! the client emits: `*:*` or `english:*term*` / `vietnamese:*term*`
//! wildcard queries, `field:"value"` and `field:("a" OR "b")` filters,
//! and a `category` facet.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Map, Value, json};

pub const CORE: &str = "vocabulary";

#[derive(Clone)]
pub struct StubIndex {
    docs: Arc<Mutex<Vec<Map<String, Value>>>>,
    healthy: bool,
}

pub struct RunningIndex {
    pub addr: SocketAddr,
    pub index: StubIndex,
}

impl RunningIndex {
    pub fn base_url(&self) -> String {
        format!("http://{}/solr", self.addr)
    }

    pub fn len(&self) -> usize {
        self.index.docs.lock().unwrap().len()
    }
}

/// `n` documents with ids `1..=n`, categories alternating Basic/Food.
/// Even ids carry a multi-valued `english` field.
pub fn sample_docs(n: usize) -> Vec<Map<String, Value>> {
    (1..=n)
        .map(|i| {
            let english = if i % 2 == 0 {
                json!([format!("word{i}"), format!("alt{i}")])
            } else {
                json!(format!("word{i}"))
            };
            let doc = json!({
                "id": i.to_string(),
                "english": english,
                "vietnamese": format!("từ {i}"),
                "type": "noun",
                "category": if i % 2 == 0 { "Food" } else { "Basic" },
                "masteryLevel": i % 6,
            });
            match doc {
                Value::Object(map) => map,
                _ => unreachable!(),
            }
        })
        .collect()
}

pub async fn start(docs: Vec<Map<String, Value>>) -> RunningIndex {
    start_with(docs, true).await
}

pub async fn start_with(docs: Vec<Map<String, Value>>, healthy: bool) -> RunningIndex {
    let index = StubIndex { docs: Arc::new(Mutex::new(docs)), healthy };
    let app = Router::new()
        .route(&format!("/solr/{CORE}/select"), get(select))
        .route(&format!("/solr/{CORE}/update"), post(update))
        .route(&format!("/solr/{CORE}/admin/ping"), get(ping))
        .with_state(index.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    RunningIndex { addr, index }
}

async fn ping(State(index): State<StubIndex>) -> (StatusCode, Json<Value>) {
    if index.healthy {
        (StatusCode::OK, Json(json!({"status": "OK"})))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"error": {"msg": "core down", "code": 503}})))
    }
}

fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

fn field_values(doc: &Map<String, Value>, field: &str) -> Vec<String> {
    let scalar = |v: &Value| match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    };
    match doc.get(field) {
        Some(Value::Array(items)) => items.iter().filter_map(scalar).collect(),
        Some(v) => scalar(v).into_iter().collect(),
        None => Vec::new(),
    }
}

fn unquote(v: &str) -> String {
    v.trim().trim_matches('"').replace("\\\"", "\"")
}

fn matches_filter(doc: &Map<String, Value>, fq: &str) -> bool {
    let Some((field, raw)) = fq.split_once(':') else {
        return false;
    };
    let wanted: Vec<String> = match raw.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        Some(inner) => inner.split(" OR ").map(unquote).collect(),
        None => vec![unquote(raw)],
    };
    field_values(doc, field).iter().any(|v| wanted.contains(v))
}

fn unescape(term: &str) -> String {
    let mut out = String::new();
    let mut chars = term.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn matches_query(doc: &Map<String, Value>, q: &str) -> bool {
    if q == "*:*" {
        return true;
    }
    q.split(" OR ").any(|clause| {
        let Some((field, pattern)) = clause.split_once(':') else {
            return false;
        };
        let term = unescape(pattern.trim_start_matches('*').trim_end_matches('*')).to_lowercase();
        field_values(doc, field).iter().any(|v| v.to_lowercase().contains(&term))
    })
}

async fn select(
    State(index): State<StubIndex>,
    Query(params): Query<Vec<(String, String)>>,
) -> Json<Value> {
    let q = param(&params, "q").unwrap_or("*:*");
    let rows: usize = param(&params, "rows").and_then(|r| r.parse().ok()).unwrap_or(10);
    let start: usize = param(&params, "start").and_then(|s| s.parse().ok()).unwrap_or(0);
    let filters: Vec<&str> =
        params.iter().filter(|(k, _)| k == "fq").map(|(_, v)| v.as_str()).collect();

    let docs = index.docs.lock().unwrap();
    let matched: Vec<&Map<String, Value>> = docs
        .iter()
        .filter(|d| matches_query(d, q))
        .filter(|d| filters.iter().all(|fq| matches_filter(d, fq)))
        .collect();
    let page: Vec<Value> =
        matched.iter().skip(start).take(rows).map(|d| Value::Object((*d).clone())).collect();

    let mut body = json!({
        "responseHeader": {"status": 0},
        "response": {"numFound": matched.len(), "start": start, "docs": page},
    });
    if param(&params, "facet") == Some("true") {
        let mut counts: Vec<(String, u64)> = Vec::new();
        for doc in &matched {
            for cat in field_values(doc, "category") {
                match counts.iter_mut().find(|(name, _)| *name == cat) {
                    Some((_, n)) => *n += 1,
                    None => counts.push((cat, 1)),
                }
            }
        }
        let flat: Vec<Value> =
            counts.into_iter().flat_map(|(name, n)| [json!(name), json!(n)]).collect();
        body["facet_counts"] = json!({"facet_fields": {"category": flat}});
    }
    Json(body)
}

async fn update(State(index): State<StubIndex>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let mut docs = index.docs.lock().unwrap();
    match body {
        Value::Array(items) => {
            for item in items {
                let Value::Object(doc) = item else {
                    return (StatusCode::BAD_REQUEST, Json(json!({"error": {"msg": "not a document"}})));
                };
                let id = doc.get("id").cloned();
                docs.retain(|d| d.get("id") != id.as_ref());
                docs.push(doc);
            }
        }
        Value::Object(cmd) => {
            let id = cmd.get("delete").and_then(|d| d.get("id")).cloned();
            docs.retain(|d| d.get("id") != id.as_ref());
        }
        _ => return (StatusCode::BAD_REQUEST, Json(json!({"error": {"msg": "bad update"}}))),
    }
    (StatusCode::OK, Json(json!({"responseHeader": {"status": 0}})))
}
