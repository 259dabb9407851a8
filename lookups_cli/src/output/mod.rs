use crate::cli::OutputFormat;
use crate::commands::Result;
use lookups_core::{Entity, QueryIntent, ServerInfo};
use serde::Serialize;
use serde_json::Value;

mod pretty;
pub use pretty::format_cards;

/// Terminal width for formatting (default fallback)
const DEFAULT_WIDTH: usize = 80;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum OutputData {
    ConnectorList(Vec<ServerInfo>),
    SearchResults {
        connector: String,
        query: String,
        results: Vec<Entity>,
    },
    Classification {
        connector: String,
        query: String,
        intent: QueryIntent,
    },
    ConfigInfo(Value),
}

pub fn format_output(data: &OutputData, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(data)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(data)?);
        }
        OutputFormat::Text | OutputFormat::Pretty => {
            print!("{}", format_text(data)?);
        }
    }
    Ok(())
}

/// Plain, uncoloured rendering suitable for piping.
fn format_text(data: &OutputData) -> Result<String> {
    let mut out = String::new();
    match data {
        OutputData::ConnectorList(connectors) => {
            for connector in connectors {
                out.push_str(&format!("{}: {}\n", connector.name, connector.description));
            }
        }
        OutputData::SearchResults { results, .. } => {
            // One record per line, tab-separated: @id, name
            for entity in results {
                out.push_str(&format!(
                    "{}\t{}\n",
                    entity.id().unwrap_or("-"),
                    entity.name().unwrap_or("-")
                ));
            }
        }
        OutputData::Classification { intent, .. } => match intent {
            QueryIntent::Identifier { pattern, id } => {
                out.push_str(&format!("identifier\t{id}\t{pattern}\n"));
            }
            QueryIntent::Text(text) => out.push_str(&format!("text\t{text}\n")),
        },
        OutputData::ConfigInfo(config) => {
            out.push_str(&serde_json::to_string_pretty(config)?);
            out.push('\n');
        }
    }
    Ok(out)
}

pub fn terminal_width() -> usize {
    terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(DEFAULT_WIDTH)
}

/// First line of `s`, cut to `max_len` characters with an ellipsis.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or(s);
    if first_line.chars().count() <= max_len {
        first_line.to_string()
    } else {
        let truncated: String = first_line.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
