use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lookups")]
#[command(about = "Lookups - canonical linked-data records from research registries")]
#[command(version)]
#[command(after_help = "\x1b[1;36mQuick Start:\x1b[0m
  lookups list                                 List all available sources
  lookups search ror \"leipzig university\"      Search an organization registry
  lookups search crossref 10.1000/xyz123       Resolve a DOI directly
  lookups search pubchem ethanol --limit 3     Search compounds
  lookups classify orcid 0000-0002-1825-0097   Show how a query would be handled

\x1b[1;36mConfiguration:\x1b[0m
  lookups config path                          Show the config file location
  lookups config show                          Print the effective configuration")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    pub output: OutputFormat,

    /// Configuration file (defaults to the platform config dir)
    #[arg(long, global = true, env = "LOOKUPS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List all available sources
    #[command(alias = "ls")]
    #[command(after_help = "\x1b[1;33mExamples:\x1b[0m
  lookups list                    Show all sources
  lookups list --output json      Output as JSON")]
    List,

    /// Search one source
    ///
    /// Identifier-shaped queries (DOIs, ORCID iDs, CIDs, accessions) are
    /// resolved directly; anything else is a free-text search.
    #[command(after_help = "\x1b[1;33mExamples:\x1b[0m
  lookups search ror \"leipzig university\"
  lookups search aopwiki \"liver fibrosis\" --limit 5
  lookups search crossref \"CRISPR\" --fields name,datePublished
  lookups search mimetypes json --base-url http://localhost:5173/lookup/mimetypes")]
    Search {
        /// The source to query (e.g., ror, crossref, pubchem)
        connector: String,
        /// The search query or identifier
        query: String,
        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,
        /// Comma-separated field allow-list
        #[arg(short, long, value_delimiter = ',')]
        fields: Option<Vec<String>>,
        /// Override the record @type
        #[arg(short = 't', long = "type")]
        entity_type: Option<String>,
        /// Override the upstream origin
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Show how a source would handle a query, without network access
    #[command(after_help = "\x1b[1;33mExamples:\x1b[0m
  lookups classify crossref https://doi.org/10.1000/xyz123
  lookups classify cellosaurus cvcl_0030")]
    Classify {
        /// The source to ask
        connector: String,
        /// The query to classify
        query: String,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigAction {
    /// Print the config file location
    Path,
    /// Print the effective configuration
    Show,
}

#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable formatted output
    Pretty,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Plain text output
    Text,
}
