//! AOP-Wiki: adverse outcome pathways, their key events and key event
//! relationships.
//!
//! Each connector downloads its whole listing (`aops.json`, `events.json`,
//! `relationships.json`) once per instance and matches free text locally.
//! Per-item detail documents are memoized by numeric id.

pub mod events;
pub mod relationships;

use crate::classify::{Classifier, IdPattern, QueryIntent};
use crate::config::{SourceConfig, UnresolvedIdentifier};
use crate::connectors::continue_after_unresolved;
use crate::entity::{compact_object, Entity};
use crate::source::{DetailCache, IndexCell, Prepared, SearchRequest, SourceContext, SourceSpec};
use crate::upstream::Upstream;
use crate::utils::{array_field, id_string, matches_any, str_field, strip_html};
use crate::Connector;
use async_trait::async_trait;
use futures::future::join_all;
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::sync::Arc;

/// Public origin used for `@id`s regardless of the configured base URL.
const SITE: &str = "https://aopwiki.org";

fn aop_url(id: &str) -> String {
    format!("{SITE}/aops/{id}")
}

fn event_url(id: &str) -> String {
    format!("{SITE}/events/{id}")
}

fn relationship_url(id: &str) -> String {
    format!("{SITE}/relationships/{id}")
}

/// `"<up> → <down>"` when both ends are known.
fn relationship_label(upstream: Option<&str>, downstream: Option<&str>) -> Option<String> {
    match (upstream, downstream) {
        (Some(up), Some(down)) => Some(format!("{up} → {down}")),
        _ => None,
    }
}

/// Index entry whose `id` equals `id`.
fn find_by_id<'a>(index: &'a [Value], id: &str) -> Option<&'a Value> {
    index
        .iter()
        .find(|doc| id_string(doc, "id").as_deref() == Some(id))
}

/// The document's own `url` without its `.json` suffix, else `fallback`.
fn page_url(doc: &Value, fallback: String) -> String {
    str_field(doc, "url")
        .map(|url| url.strip_suffix(".json").unwrap_or(url).to_string())
        .unwrap_or(fallback)
}

static SPEC: SourceSpec = SourceSpec {
    name: "aopwiki",
    description: "AOP-Wiki adverse outcome pathways",
    default_base_url: "https://aopwiki.org",
    default_type: "AdverseOutcomePathway",
    min_query_len: 2,
    default_limit: 10,
    unresolved_identifier: UnresolvedIdentifier::TextSearch,
    default_fields: &[],
};

static CLASSIFIER: Lazy<Classifier> = Lazy::new(|| {
    Classifier::new(vec![
        IdPattern::new("aop_number", r"^(?P<id>\d+)$", "Bare AOP number (12)"),
        IdPattern::new(
            "aop_prefixed",
            r"(?i)aop[-_\s:]*(?P<id>\d+)",
            "AOP number with prefix (AOP 12, aop-12, AOP:12)",
        ),
    ])
});

pub struct AopWikiConnector {
    ctx: SourceContext,
    index: IndexCell,
    details: DetailCache,
}

impl AopWikiConnector {
    pub fn new(config: SourceConfig, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            ctx: SourceContext::new(&SPEC, config, upstream),
            index: IndexCell::new(),
            details: DetailCache::new(),
        }
    }

    async fn index(&self) -> Arc<Vec<Value>> {
        self.ctx.fetch_index(&self.index, self.ctx.url("/aops.json")).await
    }

    async fn detail(&self, id: &str) -> Option<Arc<Value>> {
        let url = self.ctx.url(&format!("/aops/{id}.json"));
        self.ctx.fetch_detail(&self.details, id, url).await
    }

    async fn format(&self, doc: &Value) -> Option<Entity> {
        let id = id_string(doc, "id")?;
        let detail = self.detail(&id).await;
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
                        str_field(doc, "abstract"),
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
impl Connector for AopWikiConnector {
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

/// Nested key-event references (`aop_mies`, `aop_kes`, `aop_aos`).
fn event_refs(detail: Option<&Value>, key: &str) -> Vec<Value> {
    let Some(detail) = detail else {
        return Vec::new();
    };
    array_field(detail, key)
        .iter()
        .filter_map(|item| {
            let id = id_string(item, "event_id").map(|id| event_url(&id));
            let name = str_field(item, "event");
            if id.is_none() && name.is_none() {
                return None;
            }
            compact_object([
                ("@id", json!(id)),
                ("name", json!(name)),
                ("eventType", json!(str_field(item, "event_type"))),
            ])
        })
        .collect()
}

fn relationship_refs(detail: Option<&Value>) -> Vec<Value> {
    let Some(detail) = detail else {
        return Vec::new();
    };
    array_field(detail, "relationships")
        .iter()
        .filter_map(|rel| {
            let relation = id_string(rel, "relation");
            let upstream = str_field(rel, "upstream_event");
            let downstream = str_field(rel, "downstream_event");
            let name = relationship_label(upstream, downstream)
                .or_else(|| relation.as_ref().map(|r| format!("Relationship {r}")));
            let id = relation.as_deref().map(relationship_url);
            if id.is_none() && name.is_none() {
                return None;
            }
            compact_object([
                ("@id", json!(id)),
                ("name", json!(name)),
                ("upstream_event", json!(upstream)),
                ("downstream_event", json!(downstream)),
            ])
        })
        .collect()
}

/// Map an `aops.json` entry plus its optional detail document.
fn normalize(doc: &Value, detail: Option<&Value>, entity_type: &str) -> Entity {
    let id = id_string(doc, "id").unwrap_or_default();
    let id_url = aop_url(&id);
    let title = str_field(doc, "title");
    let short_name = str_field(doc, "short_name");
    let label = short_name.or(title);
    let alternative = match (short_name, title) {
        (Some(short), Some(title)) if short != title => Some(short),
        _ => None,
    };
    let summary = str_field(doc, "abstract").map(strip_html);
    let from_detail = |pointer: &str| detail.and_then(|d| d.pointer(pointer)).cloned();

    Entity::new(Some(id_url.clone()), entity_type)
        .set("name", title.or(label))
        .set("label", label)
        .set("title", title)
        .set("short_name", short_name)
        .set("alternative", alternative)
        .set("identifier", id_url.as_str())
        .set("page", id_url.as_str())
        .set("source", from_detail("/source"))
        .set("created", from_detail("/created_at"))
        .set("modified", from_detail("/updated_at"))
        .set("creator", from_detail("/corresponding_author/id"))
        .set("abstract", summary.clone())
        .set("description", summary)
        .set("has_molecular_initiating_event", event_refs(detail, "aop_mies"))
        .set("has_key_event", event_refs(detail, "aop_kes"))
        .set("has_adverse_outcome", event_refs(detail, "aop_aos"))
        .set("has_key_event_relationship", relationship_refs(detail))
        .set("url", page_url(doc, id_url))
}
