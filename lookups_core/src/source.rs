//! Shared plumbing every source connector is built from.
//!
//! A connector pairs a static [`SourceSpec`] (what the source is) with a
//! [`SourceContext`] (how this instance talks to it). The context owns input
//! validation, URL building, failure-tolerant fetching, memoized detail
//! lookups and the final identity/projection pass over results.

use crate::config::{SourceConfig, UnresolvedIdentifier};
use crate::entity::Entity;
use crate::projection::FieldProjection;
use crate::singleflight::SingleFlight;
use crate::upstream::{Upstream, UpstreamClient, UpstreamRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

/// A search call. `limit` falls back to the source's default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Static description of an upstream source.
#[derive(Debug, Clone, Copy)]
pub struct SourceSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub default_base_url: &'static str,
    pub default_type: &'static str,
    /// Trimmed queries shorter than this never reach the network
    pub min_query_len: usize,
    pub default_limit: usize,
    pub unresolved_identifier: UnresolvedIdentifier,
    /// Projection used when the caller configures none
    pub default_fields: &'static [&'static str],
}

/// A validated query ready to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prepared<'a> {
    pub query: &'a str,
    pub limit: usize,
}

/// Cached detail documents keyed by source-native identifier.
pub type DetailCache = SingleFlight<String, Option<Arc<Value>>>;

/// A whole-index fetch shared by every search on one connector instance.
pub type IndexCell = OnceCell<Arc<Vec<Value>>>;

/// A single document fetched once per connector instance (`None` on failure).
pub type DocumentCell = OnceCell<Option<Arc<Value>>>;

pub struct SourceContext {
    spec: &'static SourceSpec,
    base_url: String,
    headers: Vec<(String, String)>,
    entity_type: String,
    projection: FieldProjection,
    unresolved: UnresolvedIdentifier,
    upstream: UpstreamClient,
}

impl SourceContext {
    pub fn new(spec: &'static SourceSpec, config: SourceConfig, upstream: Arc<dyn Upstream>) -> Self {
        let base_url = config
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(spec.default_base_url)
            .trim_end_matches('/')
            .to_string();
        let entity_type = config
            .entity_type
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(spec.default_type)
            .to_string();

        Self {
            spec,
            base_url,
            headers: config.headers.into_iter().collect(),
            entity_type,
            projection: FieldProjection::with_default(config.fields, spec.default_fields),
            unresolved: config
                .on_unresolved_identifier
                .unwrap_or(spec.unresolved_identifier),
            upstream: UpstreamClient::new(upstream, spec.name),
        }
    }

    pub fn spec(&self) -> &'static SourceSpec {
        self.spec
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn projection(&self) -> &FieldProjection {
        &self.projection
    }

    /// Whether an unresolved identifier should fall through to text search.
    pub fn falls_back_to_text(&self) -> bool {
        self.unresolved == UnresolvedIdentifier::TextSearch
    }

    /// Trim the query and resolve the limit. `None` means "return nothing
    /// without touching the network".
    pub fn prepare<'a>(&self, request: &'a SearchRequest) -> Option<Prepared<'a>> {
        let query = request.query.trim();
        let limit = request.limit.unwrap_or(self.spec.default_limit);
        if query.chars().count() < self.spec.min_query_len.max(1) || limit == 0 {
            debug!(
                target: "lookups.search",
                source = self.spec.name,
                query,
                limit,
                "query rejected before upstream access"
            );
            return None;
        }
        Some(Prepared { query, limit })
    }

    /// `base_url` joined with `path` (which should start with `/`).
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn request(&self, url: impl Into<String>) -> UpstreamRequest {
        self.headers
            .iter()
            .fold(UpstreamRequest::get(url), |request, (name, value)| {
                request.header(name.as_str(), value.as_str())
            })
    }

    pub async fn fetch(&self, url: impl Into<String>) -> Option<Value> {
        self.upstream.fetch_document(self.request(url)).await
    }

    pub async fn fetch_request(&self, request: UpstreamRequest) -> Option<Value> {
        self.upstream.fetch_document(request).await
    }

    /// Fetch a detail document at most once per `key` for this instance.
    pub async fn fetch_detail(
        &self,
        cache: &DetailCache,
        key: impl Into<String>,
        url: impl Into<String>,
    ) -> Option<Arc<Value>> {
        let upstream = self.upstream.clone();
        let request = self.request(url);
        cache
            .get_or_fetch(key.into(), move || async move {
                upstream.fetch_document(request).await.map(Arc::new)
            })
            .await
    }

    /// Fetch a JSON array index once per instance. Non-array bodies and failures
    /// are cached as an empty index.
    pub async fn fetch_index(&self, cell: &IndexCell, url: impl Into<String>) -> Arc<Vec<Value>> {
        let request = self.request(url);
        cell.get_or_init(|| async {
            let items = match self.upstream.fetch_document(request).await {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            };
            Arc::new(items)
        })
        .await
        .clone()
    }

    /// Fetch one document once per instance. A failure is cached too.
    pub async fn fetch_once(&self, cell: &DocumentCell, url: impl Into<String>) -> Option<Arc<Value>> {
        let request = self.request(url);
        cell.get_or_init(|| async { self.upstream.fetch_document(request).await.map(Arc::new) })
            .await
            .clone()
    }

    /// Start a record for this source: `@id`, then the configured `@type`.
    pub fn entity(&self, id: Option<String>) -> Entity {
        Entity::new(id, &self.entity_type)
    }

    /// Drop records without identity, project the rest and cap at `limit`.
    pub fn finish<I>(&self, entities: I, limit: usize) -> Vec<Entity>
    where
        I: IntoIterator<Item = Option<Entity>>,
    {
        entities
            .into_iter()
            .flatten()
            .map(Entity::cleaned)
            .filter(Entity::has_identity)
            .filter_map(|entity| self.projection.project(entity))
            .take(limit)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConnectorError;
    use async_trait::async_trait;

    struct Offline;

    #[async_trait]
    impl Upstream for Offline {
        async fn get_json(&self, request: &UpstreamRequest) -> Result<Value, ConnectorError> {
            Err(ConnectorError::Other(format!("offline: {}", request.url)))
        }
    }

    static SPEC: SourceSpec = SourceSpec {
        name: "test",
        description: "test source",
        default_base_url: "https://example.org/api",
        default_type: "Thing",
        min_query_len: 2,
        default_limit: 10,
        unresolved_identifier: UnresolvedIdentifier::TextSearch,
        default_fields: &[],
    };

    fn context(config: SourceConfig) -> SourceContext {
        SourceContext::new(&SPEC, config, Arc::new(Offline))
    }

    #[test]
    fn config_overrides_origin_and_type() {
        let ctx = context(
            SourceConfig::default()
                .with_base_url("/lookup/test/")
                .with_type("Widget"),
        );
        assert_eq!(ctx.url("/items"), "/lookup/test/items");
        assert_eq!(ctx.entity(None).entity_type(), Some("Widget"));
    }

    #[test]
    fn blank_overrides_fall_back_to_defaults() {
        let ctx = context(SourceConfig::default().with_base_url(" ").with_type(""));
        assert_eq!(ctx.base_url(), "https://example.org/api");
        assert_eq!(ctx.entity_type(), "Thing");
    }

    #[test]
    fn prepare_enforces_minimum_length_and_limit() {
        let ctx = context(SourceConfig::default());
        assert!(ctx.prepare(&SearchRequest::new(" a ")).is_none());
        assert!(ctx.prepare(&SearchRequest::new("ab").with_limit(0)).is_none());

        let request = SearchRequest::new("  ab ");
        let prepared = ctx.prepare(&request).unwrap();
        assert_eq!(prepared.query, "ab");
        assert_eq!(prepared.limit, 10);
    }

    #[test]
    fn configured_headers_are_attached() {
        let ctx = context(SourceConfig::default().with_header("x-api-key", "secret"));
        let request = ctx.request("https://example.org/api/items");
        assert_eq!(request.header_value("X-API-KEY"), Some("secret"));
    }

    #[test]
    fn finish_filters_projects_and_caps() {
        let ctx = context(SourceConfig::default().with_fields(["name"]));
        let results = ctx.finish(
            vec![
                Some(ctx.entity(Some("urn:1".into())).set("name", "one").set("extra", 1)),
                None,
                Some(ctx.entity(None).set("description", "no identity")),
                Some(ctx.entity(None).set("name", "two")),
                Some(ctx.entity(None).set("name", "three")),
            ],
            2,
        );
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].keys().collect::<Vec<_>>(), vec!["@id", "@type", "name"]);
        assert_eq!(results[1].name(), Some("two"));
    }

    #[tokio::test]
    async fn failed_index_fetch_is_cached_as_empty() {
        let ctx = context(SourceConfig::default());
        let cell = IndexCell::new();
        let index = ctx.fetch_index(&cell, ctx.url("/index.json")).await;
        assert!(index.is_empty());
        assert!(cell.initialized());
    }

    #[tokio::test]
    async fn failed_document_fetch_is_cached_as_none() {
        let ctx = context(SourceConfig::default());
        let cell = DocumentCell::new();
        assert!(ctx.fetch_once(&cell, ctx.url("/db.json")).await.is_none());
        assert!(cell.initialized());
    }
}
