use clap::Parser;
use owo_colors::OwoColorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod output;

use cli::{Cli, Commands};
use commands::*;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Targets are prefix-matched, so `lookups` also covers `lookups.upstream`
    // and `lookups_core`. RUST_LOG wins over -v.
    let default_filter = match cli.verbose {
        0 => "lookups_cli=info,lookups=warn",
        1 => "lookups=debug",
        _ => "lookups=trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match &cli.command {
        None => show_overview(&cli),
        Some(Commands::List) => list::run(&cli),
        Some(Commands::Search {
            connector,
            query,
            limit,
            fields,
            entity_type,
            base_url,
        }) => {
            let overrides = search::Overrides {
                fields: fields.clone(),
                entity_type: entity_type.clone(),
                base_url: base_url.clone(),
            };
            search::run(&cli, connector, query, *limit, overrides).await
        }
        Some(Commands::Classify { connector, query }) => classify::run(&cli, connector, query),
        Some(Commands::Config { action }) => config::run(&cli, action.clone()),
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        process::exit(1);
    }
}

fn show_overview(cli: &Cli) -> commands::Result<()> {
    println!();
    println!(
        "{}  {}",
        "Lookups".bold().cyan(),
        "- Canonical records from research registries".dimmed()
    );
    println!();

    let registry = create_registry(cli, None)?;
    let providers = registry.list_providers();
    println!(
        "  {} sources available",
        providers.len().to_string().green().bold()
    );
    let names: Vec<_> = providers.iter().map(|p| p.name.cyan().to_string()).collect();
    println!("  {}", names.join(", "));
    println!();

    println!("{}", "Quick Start:".bold().cyan());
    println!(
        "  {}{}",
        "lookups search ror \"leipzig\"".cyan(),
        "      Search an organization registry".dimmed()
    );
    println!(
        "  {}{}",
        "lookups classify bao BAO_0000015".cyan(),
        "  Check identifier detection".dimmed()
    );
    println!();
    println!(
        "{} Use {} for full help",
        "Tip:".dimmed(),
        "lookups --help".cyan()
    );
    println!();

    Ok(())
}
