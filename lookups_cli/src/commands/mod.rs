pub mod classify;
pub mod config;
pub mod list;
pub mod search;

use crate::cli::Cli;
use lookups_core::{LookupsConfig, ProviderRegistry, SourceConfig};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Source '{0}' not found (see `lookups list`)")]
    ConnectorNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Core library error: {0}")]
    Core(#[from] lookups_core::error::ConnectorError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, CommandError>;

pub fn load_config(cli: &Cli) -> Result<LookupsConfig> {
    Ok(LookupsConfig::load_or_default(cli.config.as_deref())?)
}

/// Build the registry from the config file, with `overrides` layered onto one
/// source's settings.
pub fn create_registry(cli: &Cli, overrides: Option<(&str, SourceConfig)>) -> Result<ProviderRegistry> {
    let mut config = load_config(cli)?;
    if let Some((name, source)) = overrides {
        config.set_source(name, source);
    }
    Ok(lookups_core::build_registry_enabled_only(&config)?)
}
