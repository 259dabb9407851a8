use crate::cli::{Cli, ConfigAction, OutputFormat};
use crate::commands::{load_config, Result};
use crate::output::{format_output, OutputData};
use lookups_core::LookupsConfig;
use owo_colors::OwoColorize;

const MASK: &str = "****";

pub fn run(cli: &Cli, action: Option<ConfigAction>) -> Result<()> {
    match action.unwrap_or(ConfigAction::Show) {
        ConfigAction::Path => show_path(cli),
        ConfigAction::Show => show(cli),
    }
}

fn show_path(cli: &Cli) -> Result<()> {
    let path = cli.config.clone().or_else(LookupsConfig::default_path);
    match path {
        Some(path) => {
            let marker = if path.exists() { "" } else { " (not created yet)" };
            println!("{}{}", path.display(), marker.dimmed());
        }
        None => println!("{}", "No config directory on this platform".yellow()),
    }
    Ok(())
}

fn show(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    // Header values may hold credentials.
    let mut masked = config.clone();
    for source in masked.sources.values_mut() {
        source.headers.values_mut().for_each(|value| *value = MASK.to_string());
    }
    let value = serde_json::to_value(&masked)?;

    if cli.output != OutputFormat::Pretty {
        return format_output(&OutputData::ConfigInfo(value), &cli.output);
    }

    println!("{}", "Effective configuration".bold().cyan());
    println!();
    println!(
        "  {}: {}",
        "user_agent".dimmed(),
        config.http.user_agent
    );
    println!(
        "  {}: {}s",
        "timeout".dimmed(),
        config.http.timeout_secs
    );
    println!();

    if config.sources.is_empty() {
        println!("  {}", "No per-source settings; every source uses its defaults".dimmed());
        return Ok(());
    }
    for (name, source) in &config.sources {
        println!("  {}", name.green().bold());
        if let Some(base_url) = &source.base_url {
            println!("    {}: {}", "base_url".dimmed(), base_url.blue());
        }
        if let Some(fields) = &source.fields {
            println!("    {}: {}", "fields".dimmed(), fields.join(", "));
        }
        if let Some(entity_type) = &source.entity_type {
            println!("    {}: {}", "type".dimmed(), entity_type);
        }
        if let Some(policy) = source.on_unresolved_identifier {
            println!("    {}: {:?}", "on_unresolved_identifier".dimmed(), policy);
        }
        for name in source.headers.keys() {
            println!("    {}: {}: {}", "header".dimmed(), name, MASK.dimmed());
        }
    }
    Ok(())
}
