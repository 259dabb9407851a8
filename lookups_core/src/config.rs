//! Connector configuration.
//!
//! Everything a connector needs from its environment arrives through these
//! types: the upstream origin, extra request headers, the field allow-list and
//! an `@type` override. The core never reads process environment variables;
//! callers resolve origins before constructing connectors.
//!
//! ```toml
//! [http]
//! user_agent = "my-app/1.0"
//! timeout_secs = 15
//!
//! [sources.ror]
//! base_url = "http://localhost:5173/lookup/ror"
//!
//! [sources.crossref]
//! fields = ["name", "datePublished"]
//! headers = { "Crossref-Plus-API-Token" = "Bearer ..." }
//! on_unresolved_identifier = "text_search"
//! ```

use crate::error::ConnectorError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

pub const DEFAULT_USER_AGENT: &str = concat!("lookups/", env!("CARGO_PKG_VERSION"));

/// What to do when an identifier-shaped query does not resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedIdentifier {
    /// Run the free-text search with the original query
    TextSearch,
    /// Return no results
    Empty,
}

/// Per-source settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Upstream origin (e.g. a same-origin relay path or the public API root)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Extra headers sent with every request (API keys, tokens)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    /// Field allow-list applied to every record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,

    /// Override for the connector's default `@type`
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_unresolved_identifier: Option<UnresolvedIdentifier>,
}

impl SourceConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn on_unresolved(mut self, policy: UnresolvedIdentifier) -> Self {
        self.on_unresolved_identifier = Some(policy);
        self
    }
}

/// Settings for the shared HTTP client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSettings {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LookupsConfig {
    #[serde(default)]
    pub http: HttpSettings,

    #[serde(default)]
    pub sources: BTreeMap<String, SourceConfig>,
}

impl LookupsConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConnectorError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConnectorError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        debug!(path = %path.display(), sources = config.sources.len(), "loaded lookups config");
        Ok(config)
    }

    /// Load from `path` if given, else from the default location. A missing
    /// default file yields the default configuration.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConnectorError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(default) if default.exists() => Self::load(&default),
            _ => Ok(Self::default()),
        }
    }

    /// `~/.config/lookups/config.toml` (platform equivalent)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("lookups").join("config.toml"))
    }

    /// Settings for one source; unknown names get defaults.
    pub fn source(&self, name: &str) -> SourceConfig {
        self.sources.get(name).cloned().unwrap_or_default()
    }

    pub fn set_source(&mut self, name: impl Into<String>, config: SourceConfig) {
        self.sources.insert(name.into(), config);
    }
}
