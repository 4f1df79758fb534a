//! Text extraction from schemaless origin records
//!
//! Origin records have no fixed shape, so content is picked by an ordered
//! table of strategies. The first strategy that yields text wins.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::domain::document::Metadata;

/// Text-bearing field names, most preferred first
pub const PRIORITY_FIELDS: [&str; 16] = [
    "content",
    "text",
    "body",
    "description",
    "summary",
    "fullplot",
    "plot",
    "title",
    "name",
    "display_name",
    "message",
    "comment",
    "note",
    "details",
    "value",
    "data",
];

/// Identifiers, timestamps and credentials; never treated as content
pub const EXCLUDED_FIELDS: [&str; 25] = [
    "_id",
    "id",
    "uuid",
    "connection_id",
    "raw_document_id",
    "password",
    "api_key",
    "secret",
    "token",
    "encrypted_uri",
    "encrypted_api_key",
    "encrypted_password",
    "encrypted_secret",
    "created_at",
    "updated_at",
    "createdAt",
    "updatedAt",
    "timestamp",
    "last_modified",
    "modified_at",
    "modifiedAt",
    "status",
    "type",
    "provider",
    "scopes",
];

const ENCRYPTED_PREFIX: &str = "encrypted_";

/// Short list-like fields kept even when their text is brief
const SHORT_TEXT_FIELDS: [&str; 4] = ["directors", "writers", "countries", "languages"];

const MIN_TEXT_LEN: usize = 10;
const MIN_NESTED_LEN: usize = 20;
const MAX_DATE_LEN: usize = 30;
const MAX_STRUCTURED_LEN: usize = 200;

static DATE_LIKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(\d{4}[-/]\d{1,2}[-/]\d{1,2}([T ]\d{1,2}:\d{2}(:\d{2}(\.\d+)?)?)?(Z|[+-]\d{2}:?\d{2})?|\d{1,2}[-/]\d{1,2}[-/]\d{2,4}|\d{1,2}:\d{2}(:\d{2})?)$",
    )
    .unwrap()
});

/// One step of the extraction table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// Known text fields, each prefixed with its name
    PriorityFields,
    /// Any other field that looks like prose, lists and nested objects included
    HeuristicText,
    /// Pretty JSON of the non-excluded scalar and small structured fields
    StructuredDump,
}

/// Order in which strategies are tried
pub const EXTRACTION_ORDER: [ExtractionStrategy; 3] = [
    ExtractionStrategy::PriorityFields,
    ExtractionStrategy::HeuristicText,
    ExtractionStrategy::StructuredDump,
];

/// Extract the text to embed from a record; empty when nothing qualifies.
pub fn extract_text_content(record: &Metadata) -> String {
    EXTRACTION_ORDER
        .iter()
        .find_map(|strategy| apply(*strategy, record))
        .unwrap_or_default()
}

pub fn apply(strategy: ExtractionStrategy, record: &Metadata) -> Option<String> {
    let text = match strategy {
        ExtractionStrategy::PriorityFields => join_parts(priority_parts(record)),
        ExtractionStrategy::HeuristicText => join_parts(heuristic_parts(record)),
        ExtractionStrategy::StructuredDump => structured_dump(record),
    };

    text.filter(|t| !t.is_empty())
}

pub fn is_excluded_field(key: &str) -> bool {
    EXCLUDED_FIELDS.contains(&key) || key.starts_with(ENCRYPTED_PREFIX)
}

fn priority_parts(record: &Metadata) -> Vec<String> {
    PRIORITY_FIELDS
        .iter()
        .filter_map(|field| {
            let value = record.get(*field)?;
            match value {
                Value::String(s) if !s.trim().is_empty() => Some(format!("{}: {}", field, s.trim())),
                Value::Number(n) if n.as_f64().is_some_and(|f| f != 0.0) => {
                    Some(format!("{}: {}", field, n))
                }
                _ => None,
            }
        })
        .collect()
}

fn heuristic_parts(record: &Metadata) -> Vec<String> {
    let mut parts = Vec::new();

    for (key, value) in record {
        if is_excluded_field(key) || PRIORITY_FIELDS.contains(&key.as_str()) {
            continue;
        }

        match value {
            Value::String(s) => {
                if looks_like_identifier(s) || looks_like_date(s) {
                    continue;
                }
                let trimmed = s.trim();
                if trimmed.chars().count() > MIN_TEXT_LEN
                    || SHORT_TEXT_FIELDS.contains(&key.as_str())
                {
                    parts.push(format!("{}: {}", key, trimmed));
                }
            }
            Value::Number(n) => parts.push(format!("{}: {}", key, n)),
            Value::Bool(b) => parts.push(format!("{}: {}", key, b)),
            Value::Array(items) => {
                let texts: Vec<String> = items
                    .iter()
                    .filter_map(|item| match item {
                        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                        Value::Object(nested) => {
                            Some(extract_text_content(nested)).filter(|t| !t.is_empty())
                        }
                        _ => None,
                    })
                    .collect();
                if !texts.is_empty() {
                    parts.push(format!("{}: {}", key, texts.join(", ")));
                }
            }
            Value::Object(nested) => {
                let text = extract_text_content(nested);
                if text.chars().count() > MIN_NESTED_LEN {
                    parts.push(format!("{}: {}", key, text));
                }
            }
            Value::Null => {}
        }
    }

    parts
}

fn structured_dump(record: &Metadata) -> Option<String> {
    let filtered: Metadata = record
        .iter()
        .filter(|(key, _)| !is_excluded_field(key))
        .filter(|(_, value)| match value {
            Value::String(s) => !s.trim().is_empty(),
            Value::Number(_) | Value::Bool(_) => true,
            Value::Array(_) | Value::Object(_) => value.to_string().len() < MAX_STRUCTURED_LEN,
            Value::Null => false,
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    if filtered.is_empty() {
        return None;
    }

    serde_json::to_string_pretty(&Value::Object(filtered)).ok()
}

fn join_parts(parts: Vec<String>) -> Option<String> {
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n\n"))
    }
}

/// Short codes such as `tt0111161`, `en_US` or `PG-13`
fn looks_like_identifier(value: &str) -> bool {
    value.chars().count() < MIN_TEXT_LEN
        && (value.chars().all(char::is_alphanumeric) || value.contains('_') || value.contains('-'))
}

fn looks_like_date(value: &str) -> bool {
    value.chars().any(|c| c.is_ascii_digit())
        && value.chars().count() < MAX_DATE_LEN
        && DATE_LIKE.is_match(value.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Metadata {
        match value {
            Value::Object(map) => map,
            _ => panic!("record must be an object"),
        }
    }

    #[test]
    fn test_priority_fields_keep_table_order() {
        let doc = record(json!({
            "_id": "507f1f77bcf86cd799439011",
            "fullplot": "A story about a prison friendship.",
            "title": "Sample",
            "year": 1994
        }));

        assert_eq!(
            extract_text_content(&doc),
            "fullplot: A story about a prison friendship.\n\ntitle: Sample"
        );
    }

    #[test]
    fn test_single_priority_field_keeps_prefix() {
        let doc = record(json!({"content": "  hello world  "}));
        assert_eq!(extract_text_content(&doc), "content: hello world");
    }

    #[test]
    fn test_heuristic_skips_ids_dates_and_secrets() {
        let doc = record(json!({
            "_id": "abc",
            "rated": "PG-13",
            "released": "1994-10-14T00:00:00+00:00",
            "encrypted_token": "gAAAAABk-something-long-enough",
            "password": "hunter2hunter2",
            "plot_outline": "Two imprisoned men bond over a number of years.",
            "runtime": 142,
            "genres": ["Drama", "Crime"],
            "awards": {"text": "Nominated for 7 Oscars.", "wins": 21}
        }));

        let text = extract_text_content(&doc);
        assert!(text.contains("plot_outline: Two imprisoned men bond"));
        assert!(text.contains("runtime: 142"));
        assert!(text.contains("genres: Drama, Crime"));
        assert!(text.contains("awards: text: Nominated for 7 Oscars."));
        assert!(!text.contains("PG-13"));
        assert!(!text.contains("1994-10-14"));
        assert!(!text.contains("gAAAA"));
        assert!(!text.contains("hunter2"));
    }

    #[test]
    fn test_short_list_fields_are_kept() {
        let doc = record(json!({"directors": "Ang Lee, X"}));
        assert_eq!(
            apply(ExtractionStrategy::HeuristicText, &doc).as_deref(),
            Some("directors: Ang Lee, X")
        );
    }

    #[test]
    fn test_structured_dump_is_last_resort() {
        let doc = record(json!({
            "_id": "1",
            "code": "X1",
            "updated_at": "2024-01-01"
        }));

        assert_eq!(apply(ExtractionStrategy::PriorityFields, &doc), None);
        assert_eq!(apply(ExtractionStrategy::HeuristicText, &doc), None);
        assert_eq!(extract_text_content(&doc), "{\n  \"code\": \"X1\"\n}");
    }

    #[test]
    fn test_nothing_extractable() {
        let doc = record(json!({"_id": "1", "status": "active", "empty": ""}));
        assert_eq!(extract_text_content(&doc), "");
    }

    #[test]
    fn test_date_detection() {
        assert!(looks_like_date("2024-01-05"));
        assert!(looks_like_date("2024-01-05T10:30:00Z"));
        assert!(looks_like_date("01/05/2024"));
        assert!(!looks_like_date("Chapter 12 of the book"));
        assert!(!looks_like_date("no digits here"));
    }
}
