use crate::cli::{Cli, OutputFormat};
use crate::commands::{create_registry, load_config, CommandError, Result};
use crate::output::{format_cards, format_output, OutputData};
use indicatif::{ProgressBar, ProgressStyle};
use lookups_core::{Connector, SearchRequest, SourceConfig};
use owo_colors::OwoColorize;
use std::time::{Duration, Instant};

/// Per-invocation settings layered over the config file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub fields: Option<Vec<String>>,
    pub entity_type: Option<String>,
    pub base_url: Option<String>,
}

impl Overrides {
    fn is_empty(&self) -> bool {
        self.fields.is_none() && self.entity_type.is_none() && self.base_url.is_none()
    }

    fn apply(self, mut source: SourceConfig) -> SourceConfig {
        if let Some(fields) = self.fields {
            source = source.with_fields(fields);
        }
        if let Some(entity_type) = self.entity_type {
            source = source.with_type(entity_type);
        }
        if let Some(base_url) = self.base_url {
            source = source.with_base_url(base_url);
        }
        source
    }
}

pub async fn run(
    cli: &Cli,
    connector_name: &str,
    query: &str,
    limit: Option<usize>,
    overrides: Overrides,
) -> Result<()> {
    if limit == Some(0) {
        return Err(CommandError::InvalidInput("--limit must be at least 1".to_string()));
    }

    let mut registry = create_registry(cli, None)?;
    // Aliases resolve to the canonical name, which keys the config.
    let canonical = registry
        .get_provider(connector_name)
        .map(|c| c.name())
        .ok_or_else(|| CommandError::ConnectorNotFound(connector_name.to_string()))?;
    if !overrides.is_empty() {
        let source = overrides.apply(load_config(cli)?.source(canonical));
        registry = create_registry(cli, Some((canonical, source)))?;
    }
    let connector = registry
        .get_provider(canonical)
        .ok_or_else(|| CommandError::ConnectorNotFound(connector_name.to_string()))?
        .clone();

    let spinner = ProgressBar::new_spinner();
    if cli.output == OutputFormat::Pretty {
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(format!("Searching {} for '{}'...", canonical, query));
        spinner.enable_steady_tick(Duration::from_millis(100));
    }

    let started = Instant::now();
    let mut request = SearchRequest::new(query);
    request.limit = limit;
    let results = connector.search(request).await;
    let elapsed = started.elapsed();
    spinner.finish_and_clear();

    tracing::debug!(
        source = canonical,
        results = results.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "search finished"
    );

    if cli.output != OutputFormat::Pretty {
        let data = OutputData::SearchResults {
            connector: canonical.to_string(),
            query: query.to_string(),
            results,
        };
        return format_output(&data, &cli.output);
    }

    println!("{} {}", "Search:".bold().cyan(), query.yellow());
    println!("{} {}", "Source:".dimmed(), canonical.green());
    println!();
    if results.is_empty() {
        println!("   {}", "No results".dimmed());
    } else {
        println!("{}", format_cards(&results, Some(canonical)));
    }
    println!(
        "{}",
        format!("{} results in {}ms", results.len(), elapsed.as_millis()).dimmed()
    );

    Ok(())
}
