use crate::cli::{Cli, OutputFormat};
use crate::commands::{create_registry, CommandError, Result};
use crate::output::{format_output, OutputData};
use lookups_core::{Connector, QueryIntent};
use owo_colors::OwoColorize;

pub fn run(cli: &Cli, connector_name: &str, query: &str) -> Result<()> {
    let registry = create_registry(cli, None)?;
    let connector = registry
        .get_provider(connector_name)
        .ok_or_else(|| CommandError::ConnectorNotFound(connector_name.to_string()))?;
    let intent = connector.classify(query);

    if cli.output != OutputFormat::Pretty {
        let data = OutputData::Classification {
            connector: connector.name().to_string(),
            query: query.to_string(),
            intent,
        };
        return format_output(&data, &cli.output);
    }

    match intent {
        QueryIntent::Identifier { pattern, id } => {
            println!(
                "{} {} {}",
                "Identifier".green().bold(),
                id.yellow(),
                format!("({pattern})").dimmed()
            );
            println!(
                "{}",
                format!("{} resolves this directly", connector.name()).dimmed()
            );
        }
        QueryIntent::Text(text) => {
            println!("{} {}", "Text search".cyan().bold(), text.yellow());
        }
    }
    Ok(())
}
