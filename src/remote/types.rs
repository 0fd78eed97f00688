//! Wire types for the remote search index and the normalised record shape.
//!
//! The index may hold any field either as a scalar or as a list (it indexes
//! some fields multi-valued for matching). [`FieldValue`] accepts both;
//! [`VocabularyRecord`] keeps the first element as the canonical value and
//! retains every list under `variants`.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::VocabularyEntry;

// ── Raw documents ────────────────────────────────────────────────────────────

/// A field as stored in the index: one value or many.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Multi(Vec<Value>),
    Single(Value),
}

impl FieldValue {
    /// The canonical scalar: the value itself, or the first list element.
    pub fn first(&self) -> Option<String> {
        match self {
            FieldValue::Single(v) => scalar_to_string(v),
            FieldValue::Multi(values) => values.iter().find_map(scalar_to_string),
        }
    }

    /// Every value, in index order.
    pub fn all(&self) -> Vec<String> {
        match self {
            FieldValue::Single(v) => scalar_to_string(v).into_iter().collect(),
            FieldValue::Multi(values) => values.iter().filter_map(scalar_to_string).collect(),
        }
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, FieldValue::Multi(_))
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// One document as returned by the index.
pub type IndexDocument = BTreeMap<String, FieldValue>;

// ── Select response envelope ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct SelectResponse {
    pub response: ResponseBody,
    #[serde(default)]
    pub facet_counts: Option<FacetCounts>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseBody {
    #[serde(default)]
    pub docs: Vec<IndexDocument>,
    #[serde(rename = "numFound")]
    pub num_found: u64,
    #[serde(default)]
    pub start: u64,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct FacetCounts {
    /// Flat `[term, count, term, count, ...]` lists keyed by field.
    #[serde(default)]
    pub facet_fields: HashMap<String, Vec<Value>>,
}

impl FacetCounts {
    pub fn terms(&self, field: &str) -> Vec<CategoryCount> {
        let Some(flat) = self.facet_fields.get(field) else {
            return Vec::new();
        };
        flat.chunks(2)
            .filter_map(|pair| match pair {
                [name, count] => Some(CategoryCount {
                    name: scalar_to_string(name)?,
                    count: count.as_u64()?,
                }),
                _ => None,
            })
            .collect()
    }
}

// ── Public result shapes ─────────────────────────────────────────────────────

/// One page of raw documents.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    pub docs: Vec<IndexDocument>,
    pub total: u64,
    pub start: u64,
}

/// Search outcome in the uniform `{success, error, data, total}` shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub data: Vec<IndexDocument>,
    pub total: u64,
    pub start: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStatistics {
    pub total: u64,
    pub categories: Vec<CategoryCount>,
}

// ── Query filters ────────────────────────────────────────────────────────────

/// A filter-query clause, rendered as one `fq` parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `field:"value"`
    Eq { field: String, value: String },
    /// `field:("a" OR "b")`
    AnyOf { field: String, values: Vec<String> },
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Eq { field: field.into(), value: value.into() }
    }

    pub fn any_of<I, S>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Filter::AnyOf { field: field.into(), values: values.into_iter().map(Into::into).collect() }
    }

    pub fn to_query(&self) -> String {
        fn quote(v: &str) -> String {
            format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\""))
        }
        match self {
            Filter::Eq { field, value } => format!("{field}:{}", quote(value)),
            Filter::AnyOf { field, values } if values.len() == 1 => {
                format!("{field}:{}", quote(&values[0]))
            }
            Filter::AnyOf { field, values } => {
                let joined = values.iter().map(|v| quote(v)).collect::<Vec<_>>().join(" OR ");
                format!("{field}:({joined})")
            }
        }
    }
}

/// Parameters for one select request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub rows: usize,
    pub start: usize,
    pub sort: Option<String>,
    /// Returned fields; empty means all.
    pub fields: Vec<String>,
    pub filters: Vec<Filter>,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: "*:*".to_string(),
            rows: 10,
            start: 0,
            sort: None,
            fields: Vec::new(),
            filters: Vec::new(),
        }
    }
}

impl SearchRequest {
    pub(crate) fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", self.query.clone()),
            ("rows", self.rows.to_string()),
            ("start", self.start.to_string()),
            ("wt", "json".to_string()),
        ];
        if let Some(sort) = &self.sort {
            params.push(("sort", sort.clone()));
        }
        if !self.fields.is_empty() {
            params.push(("fl", self.fields.join(",")));
        }
        params.extend(self.filters.iter().map(|f| ("fq", f.to_query())));
        params
    }
}

// ── Normalised record ────────────────────────────────────────────────────────

/// Canonical single-valued view of an index document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyRecord {
    pub id: String,
    pub english: String,
    pub vietnamese: String,
    #[serde(rename = "type")]
    pub word_type: String,
    pub phonetic: String,
    pub example: String,
    pub category: String,
    pub mastery_level: u8,
    /// Full value lists for fields the index holds multi-valued.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variants: BTreeMap<String, Vec<String>>,
}

impl VocabularyRecord {
    pub fn from_document(doc: &IndexDocument) -> Self {
        let get = |key: &str| doc.get(key).and_then(FieldValue::first);
        let variants = doc
            .iter()
            .filter(|(_, v)| v.is_multi())
            .map(|(k, v)| (k.clone(), v.all()))
            .collect();
        Self {
            id: get("id").unwrap_or_default(),
            english: get("english").unwrap_or_default(),
            vietnamese: get("vietnamese").unwrap_or_default(),
            word_type: get("type").unwrap_or_else(|| "unknown".to_string()),
            phonetic: get("phonetic").unwrap_or_default(),
            example: get("example").unwrap_or_default(),
            category: get("category").unwrap_or_else(|| "general".to_string()),
            mastery_level: get("masteryLevel").and_then(|l| l.parse().ok()).unwrap_or(0),
            variants,
        }
    }

    /// The document sent to the index on upsert.
    pub fn to_document(&self) -> Value {
        serde_json::json!({
            "id": self.id,
            "english": self.english,
            "vietnamese": self.vietnamese,
            "type": self.word_type,
            "phonetic": self.phonetic,
            "example": self.example,
            "category": self.category,
            "masteryLevel": self.mastery_level,
        })
    }
}

impl From<&VocabularyEntry> for VocabularyRecord {
    fn from(entry: &VocabularyEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            english: entry.english.clone(),
            vietnamese: entry.vietnamese.clone(),
            word_type: entry.word_type.clone(),
            phonetic: entry.phonetic.clone(),
            example: entry.example.clone(),
            category: entry.category.clone(),
            mastery_level: entry.mastery_level,
            variants: BTreeMap::new(),
        }
    }
}
