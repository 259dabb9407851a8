use crate::cli::{Cli, OutputFormat};
use crate::commands::{create_registry, Result};
use crate::output::{format_output, terminal_width, truncate_str, OutputData};
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, ContentArrangement, Table};
use owo_colors::OwoColorize;

pub fn run(cli: &Cli) -> Result<()> {
    let registry = create_registry(cli, None)?;
    let providers = registry.list_providers();

    if providers.is_empty() {
        println!("{}", "No sources available (all connector features disabled)".yellow());
        return Ok(());
    }

    if cli.output != OutputFormat::Pretty {
        return format_output(&OutputData::ConnectorList(providers), &cli.output);
    }

    let term_width = terminal_width();
    let desc_width = term_width.saturating_sub(30);

    println!("{}", "Available Sources".bold().cyan());
    println!();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(term_width as u16)
        .set_header(vec!["Name", "Description"]);

    for provider in &providers {
        table.add_row(vec![
            provider.name.clone(),
            truncate_str(&provider.description, desc_width.max(30)),
        ]);
    }
    println!("{}", table);

    let aliases: Vec<String> = registry
        .aliases()
        .map(|(alias, target)| format!("{alias} → {target}"))
        .collect();
    if !aliases.is_empty() {
        println!("{} {}", "Aliases:".dimmed(), aliases.join(", ").dimmed());
    }
    println!();
    println!(
        "{} Use {} to query a source",
        "Tip:".green().bold(),
        "lookups search <source> \"<query>\"".cyan()
    );

    Ok(())
}
