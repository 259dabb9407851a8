//! Card layout for entity records.
//!
//! - Name first and bold, `@id` as a clickable link below it
//! - Description wrapped to the terminal width and dimmed
//! - Remaining fields as dimmed `key: value` lines

use super::{terminal_width, truncate_str};
use lookups_core::entity::{ID, NAME, TYPE};
use lookups_core::Entity;
use owo_colors::OwoColorize;
use serde_json::Value;

/// Indent for card content (after number)
const CARD_INDENT: usize = 6;

/// Fields shown as the card body rather than as metadata.
const SNIPPET_KEYS: &[&str] = &["description", "abstract", "creditText"];

/// Metadata lines per card.
const MAX_META_LINES: usize = 8;

/// Nested items listed per metadata line.
const MAX_LIST_ITEMS: usize = 3;

pub fn format_cards(items: &[Entity], source_label: Option<&str>) -> String {
    let width = terminal_width();
    let mut output = String::new();

    if let Some(source) = source_label {
        output.push_str(&format_section_header(source, items.len(), width));
        output.push_str("\n\n");
    }
    for (i, item) in items.iter().enumerate() {
        output.push_str(&format_card(item, i + 1, width));
        if i + 1 < items.len() {
            output.push('\n');
        }
    }
    output
}

fn format_card(entity: &Entity, index: usize, width: usize) -> String {
    let mut output = String::new();
    let indent = " ".repeat(CARD_INDENT);
    let title = entity.name().or(entity.id()).unwrap_or("(unnamed)");
    let type_tag = entity
        .entity_type()
        .map(|t| format!(" [{t}]").dimmed().to_string())
        .unwrap_or_default();

    output.push_str(&format!(
        " {}. {}{}\n",
        format!("{index:>3}").cyan().bold(),
        title.bold(),
        type_tag
    ));

    if let Some(id) = entity.id() {
        output.push_str(&format!("{indent}{}\n", format_hyperlink(id, id).blue()));
    }

    if let Some(snippet) = SNIPPET_KEYS.iter().find_map(|key| entity.get_str(key)) {
        let wrap_width = width.saturating_sub(CARD_INDENT + 2).max(20);
        let options = textwrap::Options::new(wrap_width)
            .initial_indent(&indent)
            .subsequent_indent(&indent);
        for line in textwrap::wrap(&clean_snippet(snippet), options) {
            output.push_str(&format!("{}\n", line.dimmed()));
        }
    }

    let meta = entity
        .keys()
        .filter(|key| ![ID, TYPE, NAME].contains(key) && !SNIPPET_KEYS.contains(key))
        .filter_map(|key| entity.get(key).map(|value| (key, format_meta(value))))
        .filter(|(_, value)| !value.is_empty())
        .take(MAX_META_LINES);
    for (key, value) in meta {
        let budget = width.saturating_sub(CARD_INDENT + key.len() + 2).max(20);
        output.push_str(&format!(
            "{indent}{}: {}\n",
            key.dimmed(),
            truncate_str(&value, budget).dimmed()
        ));
    }

    output
}

/// One-line rendering of a field value. Nested records show their names.
fn format_meta(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => {
            let labels: Vec<String> = items.iter().map(format_meta).filter(|s| !s.is_empty()).collect();
            if labels.len() > MAX_LIST_ITEMS {
                format!(
                    "{} (+{} more)",
                    labels[..MAX_LIST_ITEMS].join(", "),
                    labels.len() - MAX_LIST_ITEMS
                )
            } else {
                labels.join(", ")
            }
        }
        Value::Object(obj) => obj
            .get(NAME)
            .or_else(|| obj.get(ID))
            .map(format_meta)
            .unwrap_or_default(),
        Value::Null => String::new(),
    }
}

fn format_section_header(label: &str, count: usize, width: usize) -> String {
    let header_text = format!("{} ({} results)", label, count);
    let line_len = (width.saturating_sub(header_text.len() + 4)).min(60);
    format!(
        "{} {} {}",
        "──".cyan(),
        header_text.green().bold(),
        "─".repeat(line_len).cyan()
    )
}

fn clean_snippet(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// OSC 8 hyperlink, understood by most modern terminals.
fn format_hyperlink(url: &str, display_text: &str) -> String {
    format!("\x1b]8;;{}\x07{}\x1b]8;;\x07", url, display_text)
}
