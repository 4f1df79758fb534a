//! Content preparation applied before chunking

use std::borrow::Cow;

/// Pretty-print JSON text with 2-space indentation so chunk boundaries fall
/// between fields rather than mid-line.
///
/// Only text whose trimmed form starts with `{` and parses as JSON is
/// reformatted; everything else is returned as is.
pub fn prepare_for_chunking<'a>(content: &'a str, content_type: &str) -> Cow<'a, str> {
    if content_type != "text" {
        return Cow::Borrowed(content);
    }

    let trimmed = content.trim();
    if !trimmed.starts_with('{') {
        return Cow::Borrowed(content);
    }

    match serde_json::from_str::<serde_json::Value>(trimmed)
        .and_then(|value| serde_json::to_string_pretty(&value))
    {
        Ok(pretty) => Cow::Owned(pretty),
        Err(_) => Cow::Borrowed(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_is_pretty_printed() {
        let prepared = prepare_for_chunking(r#"  {"title":"Sample","year":1999}"#, "text");

        assert_eq!(prepared, "{\n  \"title\": \"Sample\",\n  \"year\": 1999\n}");
    }

    #[test]
    fn test_non_ascii_is_kept() {
        let prepared = prepare_for_chunking(r#"{"name":"Amélie"}"#, "text");
        assert!(prepared.contains("Amélie"));
    }

    #[test]
    fn test_non_json_untouched() {
        assert!(matches!(
            prepare_for_chunking("{not json", "text"),
            Cow::Borrowed("{not json")
        ));
        assert!(matches!(
            prepare_for_chunking("[1, 2]", "text"),
            Cow::Borrowed(_)
        ));
        assert!(matches!(
            prepare_for_chunking(r#"{"a":1}"#, "binary"),
            Cow::Borrowed(_)
        ));
    }
}
