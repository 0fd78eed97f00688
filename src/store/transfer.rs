//! Bulk import/export codecs for vocabulary.
//!
//! Two representations are supported:
//! - JSON: a list of records (or a whole store document, whose
//!   `vocabulary` list is used).
//! - CSV: fixed header `English,Vietnamese,Type,Phonetic,Example,Category`.
//!
//! CSV handling is intentionally naive: values are wrapped in double quotes
//! on export and split on `,` with surrounding quotes stripped on import.
//! Embedded commas or quotes in source data are not escaped.

use serde_json::Value;

use super::types::{ImportFormat, NewVocabulary, VocabularyEntry};

pub const CSV_HEADER: &str = "English,Vietnamese,Type,Phonetic,Example,Category";

/// Parse `payload` into candidate records without validating them.
///
/// Returns `None` only when a JSON payload is not JSON at all. Candidates that
/// lack required fields are still returned so the caller can count them.
pub fn parse_candidates(payload: &str, format: ImportFormat) -> Option<Vec<NewVocabulary>> {
    match format {
        ImportFormat::Json => parse_json(payload),
        ImportFormat::Csv => Some(parse_csv(payload)),
    }
}

fn parse_json(payload: &str) -> Option<Vec<NewVocabulary>> {
    let value: Value = serde_json::from_str(payload).ok()?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut doc) => match doc.remove("vocabulary") {
            Some(Value::Array(items)) => items,
            _ => vec![Value::Object(doc)],
        },
        _ => return Some(Vec::new()),
    };
    Some(items.iter().map(record_from_json).collect())
}

/// Field lookup accepting both `english` and `English` key spellings.
fn field<'a>(record: &'a Value, key: &str) -> Option<&'a str> {
    let capitalised = {
        let mut chars = key.chars();
        chars
            .next()
            .map(|c| c.to_uppercase().chain(chars).collect::<String>())
            .unwrap_or_default()
    };
    record
        .get(key)
        .or_else(|| record.get(&capitalised))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn record_from_json(record: &Value) -> NewVocabulary {
    NewVocabulary {
        english: field(record, "english").unwrap_or_default().to_string(),
        vietnamese: field(record, "vietnamese").unwrap_or_default().to_string(),
        word_type: field(record, "type").map(str::to_string),
        phonetic: field(record, "phonetic").map(str::to_string),
        example: field(record, "example").map(str::to_string),
        category: field(record, "category").map(str::to_string),
        mastery_level: record
            .get("masteryLevel")
            .and_then(Value::as_u64)
            .and_then(|l| u8::try_from(l).ok()),
    }
}

fn parse_csv(payload: &str) -> Vec<NewVocabulary> {
    payload
        .lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let cols: Vec<&str> = line.split(',').map(unquote).collect();
            let col = |i: usize| cols.get(i).copied().filter(|s| !s.is_empty());
            NewVocabulary {
                english: col(0).unwrap_or_default().to_string(),
                vietnamese: col(1).unwrap_or_default().to_string(),
                word_type: col(2).map(str::to_string),
                phonetic: col(3).map(str::to_string),
                example: col(4).map(str::to_string),
                category: col(5).map(str::to_string),
                mastery_level: None,
            }
        })
        .collect()
}

fn unquote(raw: &str) -> &str {
    let t = raw.trim();
    t.strip_prefix('"').and_then(|s| s.strip_suffix('"')).unwrap_or(t).trim()
}

/// Render entries in the requested representation.
pub fn render(entries: &[VocabularyEntry], format: ImportFormat) -> Result<String, serde_json::Error> {
    match format {
        ImportFormat::Json => serde_json::to_string_pretty(entries),
        ImportFormat::Csv => {
            let mut out = String::from(CSV_HEADER);
            out.push('\n');
            for e in entries {
                let row = [&e.english, &e.vietnamese, &e.word_type, &e.phonetic, &e.example, &e.category]
                    .iter()
                    .map(|v| format!("\"{v}\""))
                    .collect::<Vec<_>>()
                    .join(",");
                out.push_str(&row);
                out.push('\n');
            }
            Ok(out)
        }
    }
}
