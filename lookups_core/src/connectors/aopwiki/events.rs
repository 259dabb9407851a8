use super::{event_url, find_by_id, page_url};
use crate::classify::{Classifier, IdPattern, QueryIntent};
use crate::config::{SourceConfig, UnresolvedIdentifier};
use crate::connectors::continue_after_unresolved;
use crate::entity::Entity;
use crate::source::{DetailCache, IndexCell, Prepared, SearchRequest, SourceContext, SourceSpec};
use crate::upstream::Upstream;
use crate::utils::{id_string, matches_any, str_at, str_field};
use crate::Connector;
use async_trait::async_trait;
use futures::future::join_all;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::sync::Arc;

static SPEC: SourceSpec = SourceSpec {
    name: "aopwiki-events",
    description: "AOP-Wiki key events and molecular initiating events",
    default_base_url: "https://aopwiki.org",
    default_type: "AopEvent",
    min_query_len: 2,
    default_limit: 10,
    unresolved_identifier: UnresolvedIdentifier::TextSearch,
    default_fields: &[],
};

static CLASSIFIER: Lazy<Classifier> = Lazy::new(|| {
    Classifier::new(vec![
        IdPattern::new("event_number", r"^(?P<id>\d+)$", "Bare event number (18)"),
        IdPattern::new(
            "event_prefixed",
            r"(?i)(?:ke|event|mie)[-_\s:]*(?P<id>\d+)",
            "Event number with prefix (KE 18, event-18, MIE:18)",
        ),
    ])
});

pub struct AopEventsConnector {
    ctx: SourceContext,
    index: IndexCell,
    details: DetailCache,
}

impl AopEventsConnector {
    pub fn new(config: SourceConfig, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            ctx: SourceContext::new(&SPEC, config, upstream),
            index: IndexCell::new(),
            details: DetailCache::new(),
        }
    }

    async fn index(&self) -> Arc<Vec<Value>> {
        self.ctx.fetch_index(&self.index, self.ctx.url("/events.json")).await
    }

    async fn format(&self, doc: &Value) -> Option<Entity> {
        let id = id_string(doc, "id")?;
        let url = self.ctx.url(&format!("/events/{id}.json"));
        let detail = self.ctx.fetch_detail(&self.details, id, url).await;
        Some(normalize(doc, detail.as_deref(), self.ctx.entity_type()))
    }

    async fn text_search(&self, index: &[Value], prepared: Prepared<'_>) -> Vec<Entity> {
        let needle = prepared.query.to_lowercase();
        let matches: Vec<&Value> = index
            .iter()
            .filter(|doc| {
                matches_any(
                    [
                        str_field(doc, "title"),
                        str_field(doc, "short_name"),
                        organization_level(doc),
                    ],
                    &needle,
                )
            })
            .take(prepared.limit)
            .collect();
        let formatted = join_all(matches.into_iter().map(|doc| self.format(doc))).await;
        self.ctx.finish(formatted, prepared.limit)
    }
}

#[async_trait]
impl Connector for AopEventsConnector {
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
        let index = self.index().await;
        if let QueryIntent::Identifier { id, .. } = self.classify(prepared.query) {
            if let Some(doc) = find_by_id(&index, &id) {
                let entity = self.format(doc).await;
                return self.ctx.finish([entity], 1);
            }
            if !continue_after_unresolved(&self.ctx, &id) {
                return Vec::new();
            }
        }
        self.text_search(&index, prepared).await
    }
}

/// `biological_organization` is either `{"term": ..}` or a plain string.
fn organization_level(doc: &Value) -> Option<&str> {
    str_at(doc, "/biological_organization/term").or_else(|| str_field(doc, "biological_organization"))
}

fn normalize(doc: &Value, detail: Option<&Value>, entity_type: &str) -> Entity {
    let id = id_string(doc, "id").unwrap_or_default();
    let id_url = event_url(&id);
    let title = str_field(doc, "title");
    let short_name = str_field(doc, "short_name");
    let level = organization_level(doc).or_else(|| detail.and_then(organization_level));
    let is_mie = detail
        .and_then(|d| d.get("molecular_initiating_event"))
        .is_some_and(|flag| match flag {
            Value::Bool(b) => *b,
            Value::Null => false,
            Value::String(s) => !s.is_empty(),
            _ => true,
        });
    let event_type = if is_mie {
        "Molecular Initiating Event"
    } else {
        "Key Event"
    };

    Entity::new(Some(id_url.clone()), entity_type)
        .set("name", title.or(short_name))
        .set("short_name", short_name.or(title))
        .set("identifier", id_url.as_str())
        .set("eventType", event_type)
        .set("biologicalOrganization", level)
        .set("url", page_url(doc, id_url))
}
