use super::{relationship_label, relationship_url};
use crate::classify::{Classifier, IdPattern, QueryIntent};
use crate::config::{SourceConfig, UnresolvedIdentifier};
use crate::connectors::continue_after_unresolved;
use crate::entity::Entity;
use crate::source::{DetailCache, IndexCell, Prepared, SearchRequest, SourceContext, SourceSpec};
use crate::upstream::Upstream;
use crate::utils::{id_string, matches_any, str_at};
use crate::Connector;
use async_trait::async_trait;
use futures::future::join_all;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::sync::Arc;

static SPEC: SourceSpec = SourceSpec {
    name: "aopwiki-relationships",
    description: "AOP-Wiki key event relationships (upstream → downstream)",
    default_base_url: "https://aopwiki.org",
    default_type: "AopEventRelationship",
    min_query_len: 2,
    default_limit: 10,
    unresolved_identifier: UnresolvedIdentifier::TextSearch,
    default_fields: &[],
};

static CLASSIFIER: Lazy<Classifier> = Lazy::new(|| {
    Classifier::new(vec![
        IdPattern::new("relationship_number", r"^(?P<id>\d+)$", "Bare relationship number (1526)"),
        IdPattern::new(
            "relationship_prefixed",
            r"(?i)(?:ker|relationship)[-_\s:]*(?P<id>\d+)",
            "Relationship number with prefix (KER 1526, relationship-1526)",
        ),
    ])
});

pub struct AopRelationshipsConnector {
    ctx: SourceContext,
    index: IndexCell,
    details: DetailCache,
}

impl AopRelationshipsConnector {
    pub fn new(config: SourceConfig, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            ctx: SourceContext::new(&SPEC, config, upstream),
            index: IndexCell::new(),
            details: DetailCache::new(),
        }
    }

    async fn index(&self) -> Arc<Vec<Value>> {
        self.ctx
            .fetch_index(&self.index, self.ctx.url("/relationships.json"))
            .await
    }

    async fn detail(&self, id: &str) -> Option<Arc<Value>> {
        let url = self.ctx.url(&format!("/relationships/{id}.json"));
        self.ctx.fetch_detail(&self.details, id, url).await
    }

    /// Matching needs the detail document, so the index is scanned in chunks
    /// of `limit` with each chunk's details fetched concurrently.
    async fn text_search(&self, index: &[Value], prepared: Prepared<'_>) -> Vec<Entity> {
        let needle = prepared.query.to_lowercase();
        let mut found = Vec::new();

        for chunk in index.chunks(prepared.limit) {
            let details = join_all(chunk.iter().map(|meta| async move {
                match id_string(meta, "id") {
                    Some(id) => self.detail(&id).await,
                    None => None,
                }
            }))
            .await;

            for detail in details.into_iter().flatten() {
                if found.len() >= prepared.limit {
                    break;
                }
                let (upstream, downstream) = event_names(&detail);
                if !matches_any([upstream, downstream], &needle) {
                    continue;
                }
                if let Some(entity) = normalize(&detail, self.ctx.entity_type()) {
                    found.push(entity);
                }
            }
            if found.len() >= prepared.limit {
                break;
            }
        }
        self.ctx.finish(found.into_iter().map(Some), prepared.limit)
    }
}

#[async_trait]
impl Connector for AopRelationshipsConnector {
    fn name(&self) -> &'static str {
        SPEC.name
    }

    fn description(&self) -> &'static str {
        SPEC.description
    }

    fn classify(&self, query: &str) -> QueryIntent {
        CLASSIFIER.classify(query)
    }

    async fn search(&self, request: SearchRequest) -> Vec<Entity> {
        let Some(prepared) = self.ctx.prepare(&request) else {
            return Vec::new();
        };
        if let QueryIntent::Identifier { id, .. } = self.classify(prepared.query) {
            // Fetched directly, so relationships missing from the listing still resolve.
            let entity = self
                .detail(&id)
                .await
                .and_then(|detail| normalize(&detail, self.ctx.entity_type()));
            if entity.is_some() {
                return self.ctx.finish([entity], 1);
            }
            if !continue_after_unresolved(&self.ctx, &id) {
                return Vec::new();
            }
        }
        let index = self.index().await;
        self.text_search(&index, prepared).await
    }
}

fn event_names(detail: &Value) -> (Option<&str>, Option<&str>) {
    (
        str_at(detail, "/events/upstream_event/name"),
        str_at(detail, "/events/downstream_event/name"),
    )
}

/// Map a relationship detail document. Requires its `id`.
fn normalize(detail: &Value, entity_type: &str) -> Option<Entity> {
    let id = id_string(detail, "id")?;
    let id_url = relationship_url(&id);
    let (upstream, downstream) = event_names(detail);
    let name = relationship_label(upstream, downstream).unwrap_or_else(|| format!("Relationship {id}"));
    let description = format!(
        "{} to {} relationship",
        upstream.unwrap_or("Unknown upstream"),
        downstream.unwrap_or("unknown downstream")
    );

    Some(
        Entity::new(Some(id_url.clone()), entity_type)
            .set("name", name)
            .set("description", description)
            .set("identifier", id_url.as_str())
            .set("upstream_event", upstream)
            .set("downstream_event", downstream)
            .set("url", id_url),
    )
}
