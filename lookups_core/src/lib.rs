// src/lib.rs
pub mod classify;
pub mod config;
pub mod connectors;
pub mod entity;
pub mod error;
pub mod projection;
pub mod singleflight;
pub mod source;
pub mod upstream;
pub mod utils;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

pub use crate::classify::QueryIntent;
pub use crate::config::{LookupsConfig, SourceConfig, UnresolvedIdentifier};
pub use crate::entity::Entity;
use crate::error::ConnectorError;
pub use crate::source::SearchRequest;
use crate::upstream::{HttpUpstream, Upstream};

#[async_trait]
pub trait Connector: Send + Sync {
    /// Returns the unique name of the connector (the registry key).
    fn name(&self) -> &'static str;

    /// Returns a description of the connector.
    fn description(&self) -> &'static str;

    /// Decide how a query would be handled, without any network access.
    fn classify(&self, query: &str) -> QueryIntent;

    /// Search the source.
    ///
    /// Never fails: upstream errors, malformed payloads and rejected queries
    /// all yield fewer (or zero) records. The result holds at most
    /// `request.limit` entities, in upstream order.
    async fn search(&self, request: SearchRequest) -> Vec<Entity>;
}

pub struct ProviderRegistry {
    pub providers: BTreeMap<String, Arc<dyn Connector>>,
    aliases: BTreeMap<String, String>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        ProviderRegistry {
            providers: BTreeMap::new(),
            aliases: BTreeMap::new(),
        }
    }

    pub fn register_provider(&mut self, provider: Arc<dyn Connector>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    /// Make `alias` resolve to an already (or later) registered connector.
    pub fn register_alias(&mut self, alias: &str, target: &str) {
        self.aliases.insert(alias.to_string(), target.to_string());
    }

    pub fn get_provider(&self, name: &str) -> Option<&Arc<dyn Connector>> {
        self.providers.get(name).or_else(|| {
            self.aliases
                .get(name)
                .and_then(|target| self.providers.get(target))
        })
    }

    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(a, t)| (a.as_str(), t.as_str()))
    }

    pub fn list_providers(&self) -> Vec<ServerInfo> {
        self.providers
            .iter()
            .map(|(name, connector)| ServerInfo {
                name: name.clone(),
                description: connector.description().to_string(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Register every connector enabled via Cargo features, configured from
/// `config` and sharing one transport.
#[cfg_attr(not(feature = "all-connectors"), allow(unused_variables))]
pub fn build_registry(config: &LookupsConfig, upstream: Arc<dyn Upstream>) -> ProviderRegistry {
    #[allow(unused_mut)]
    let mut registry = ProviderRegistry::new();

    #[cfg(feature = "ror")]
    {
        let connector = connectors::ror::RorConnector::new(config.source("ror"), upstream.clone());
        registry.register_provider(Arc::new(connector));
    }

    #[cfg(feature = "cellosaurus")]
    {
        let connector = connectors::cellosaurus::CellosaurusConnector::new(
            config.source("cellosaurus"),
            upstream.clone(),
        );
        registry.register_provider(Arc::new(connector));
    }

    #[cfg(feature = "compoundcloud")]
    {
        let connector = connectors::compoundcloud::CompoundCloudConnector::new(
            config.source("compoundcloud"),
            upstream.clone(),
        );
        registry.register_provider(Arc::new(connector));
        registry.register_alias("compoundwiki", "compoundcloud");
    }

    #[cfg(feature = "pubchem")]
    {
        let connector =
            connectors::pubchem::PubChemConnector::new(config.source("pubchem"), upstream.clone());
        registry.register_provider(Arc::new(connector));
    }

    #[cfg(feature = "bao")]
    {
        let connector = connectors::bao::BaoConnector::new(config.source("bao"), upstream.clone());
        registry.register_provider(Arc::new(connector));
    }

    #[cfg(feature = "aopwiki")]
    {
        let connector =
            connectors::aopwiki::AopWikiConnector::new(config.source("aopwiki"), upstream.clone());
        registry.register_provider(Arc::new(connector));

        let connector = connectors::aopwiki::events::AopEventsConnector::new(
            config.source("aopwiki-events"),
            upstream.clone(),
        );
        registry.register_provider(Arc::new(connector));

        let connector = connectors::aopwiki::relationships::AopRelationshipsConnector::new(
            config.source("aopwiki-relationships"),
            upstream.clone(),
        );
        registry.register_provider(Arc::new(connector));
    }

    #[cfg(feature = "orcid")]
    {
        let connector =
            connectors::orcid::OrcidConnector::new(config.source("orcid"), upstream.clone());
        registry.register_provider(Arc::new(connector));
    }

    #[cfg(feature = "crossref")]
    {
        let connector =
            connectors::crossref::CrossrefConnector::new(config.source("crossref"), upstream.clone());
        registry.register_provider(Arc::new(connector));
    }

    #[cfg(feature = "mimetypes")]
    {
        let connector = connectors::mimetypes::MimeTypesConnector::new(
            config.source("mimetypes"),
            upstream.clone(),
        );
        registry.register_provider(Arc::new(connector));
    }

    registry
}

/// Build a registry backed by the real HTTP transport.
pub fn build_registry_enabled_only(config: &LookupsConfig) -> Result<ProviderRegistry, ConnectorError> {
    let upstream = HttpUpstream::new(&config.http)?;
    Ok(build_registry(config, Arc::new(upstream)))
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub description: String,
}
