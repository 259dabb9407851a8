use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("static regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

pub fn clean_html_entities(text: &str) -> String {
    let mut cleaned = text.to_string();
    // Try decoding multiple times in case of double-encoding
    for _ in 0..2 {
        let decoded = html_escape::decode_html_entities(&cleaned).into_owned();
        if decoded == cleaned {
            break;
        }
        cleaned = decoded;
    }
    cleaned
}

/// Replace markup with spaces, decode entities and collapse whitespace.
pub fn strip_html(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }
    let without_tags = HTML_TAG.replace_all(html, " ");
    let decoded = clean_html_entities(&without_tags);
    WHITESPACE.replace_all(&decoded, " ").trim().to_string()
}

/// Case-insensitive substring match of `needle_lower` (already lowercased)
/// against any of `fields`.
pub fn matches_any<'a, I>(fields: I, needle_lower: &str) -> bool
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    fields
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(needle_lower))
}

/// Escape a value for use inside a double-quoted SPARQL string literal.
pub fn escape_sparql_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// `value[key]` as a trimmed non-empty string.
pub fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// String at a JSON pointer, trimmed and non-empty.
pub fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Identifier stored either as a JSON string or number.
pub fn id_string(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(crate::entity::scalar_string)
}

/// Every non-blank string in `value[key]`, which may be a string or array.
pub fn string_list(value: &Value, key: &str) -> Vec<String> {
    match value.get(key) {
        Some(Value::String(s)) => vec![s.trim().to_string()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .collect(),
        _ => Vec::new(),
    }
    .into_iter()
    .filter(|s| !s.is_empty())
    .collect()
}

/// Array at `key`, or an empty slice.
pub fn array_field<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Keep the first occurrence of every string, preserving order.
pub fn unique_strings<I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = std::collections::HashSet::new();
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && seen.insert(v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_markup_and_entities() {
        let html = "<p>Binding of <i>agonist</i> to&nbsp;AhR</p>\n<p>leads&amp;to  injury</p>";
        assert_eq!(strip_html(html), "Binding of agonist to AhR leads&to injury");
    }

    #[test]
    fn matches_case_insensitively() {
        assert!(matches_any([Some("Liver Fibrosis"), None], "fibrosis"));
        assert!(!matches_any([None, Some("steatosis")], "fibrosis"));
    }

    #[test]
    fn escapes_sparql_literals() {
        assert_eq!(escape_sparql_string(r#"a"b\c"#), r#"a\"b\\c"#);
    }

    #[test]
    fn reads_strings_and_lists() {
        let doc = json!({
            "label": "  assay ",
            "synonym": ["a", " ", "b"],
            "description": "single",
            "id": 42,
            "nested": {"value": "x"}
        });
        assert_eq!(str_field(&doc, "label"), Some("assay"));
        assert_eq!(string_list(&doc, "synonym"), vec!["a", "b"]);
        assert_eq!(string_list(&doc, "description"), vec!["single"]);
        assert_eq!(id_string(&doc, "id").as_deref(), Some("42"));
        assert_eq!(str_at(&doc, "/nested/value"), Some("x"));
        assert!(array_field(&doc, "missing").is_empty());
    }

    #[test]
    fn unique_strings_keeps_first_occurrence() {
        let values = vec!["b".to_string(), "a".into(), "b".into(), " ".into()];
        assert_eq!(unique_strings(values), vec!["b", "a"]);
    }
}
