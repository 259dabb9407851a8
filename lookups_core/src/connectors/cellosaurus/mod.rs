use crate::classify::{Classifier, IdPattern, QueryIntent};
use crate::config::{SourceConfig, UnresolvedIdentifier};
use crate::connectors::continue_after_unresolved;
use crate::entity::{non_blank, Entity};
use crate::source::{Prepared, SearchRequest, SourceContext, SourceSpec};
use crate::upstream::{encode_segment, with_query, Upstream};
use crate::utils::{array_field, str_field, unique_strings};
use crate::Connector;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::sync::Arc;

static SPEC: SourceSpec = SourceSpec {
    name: "cellosaurus",
    description: "Cellosaurus cell line knowledge resource",
    default_base_url: "https://api.cellosaurus.org",
    default_type: "CellLine",
    min_query_len: 2,
    default_limit: 10,
    unresolved_identifier: UnresolvedIdentifier::TextSearch,
    default_fields: &[],
};

static CLASSIFIER: Lazy<Classifier> = Lazy::new(|| {
    Classifier::new(vec![IdPattern::new(
        "cvcl",
        r"(?i)^(?:https?://(?:www\.)?cellosaurus\.org/)?cvcl[_:](?P<id>[a-z0-9]{4})$",
        "Cellosaurus accession (CVCL_0030, CVCL:0030)",
    )
    .normalize_with(|raw| format!("CVCL_{}", raw.to_uppercase()))])
});

pub struct CellosaurusConnector {
    ctx: SourceContext,
}

impl CellosaurusConnector {
    pub fn new(config: SourceConfig, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            ctx: SourceContext::new(&SPEC, config, upstream),
        }
    }

    async fn lookup(&self, accession: &str) -> Option<Entity> {
        let url = with_query(
            &self.ctx.url(&format!("/cell-line/{}", encode_segment(accession))),
            &[("format", "json")],
        );
        let doc = self.ctx.fetch(url).await?;
        cell_lines(&doc)
            .iter()
            .find_map(|entry| normalize(entry, self.ctx.entity_type()))
    }

    async fn text_search(&self, prepared: Prepared<'_>) -> Vec<Entity> {
        let rows = prepared.limit.to_string();
        let url = with_query(
            &self.ctx.url("/search/cell-line"),
            &[("q", prepared.query), ("rows", rows.as_str())],
        );
        let Some(doc) = self.ctx.fetch(url).await else {
            return Vec::new();
        };
        self.ctx.finish(
            cell_lines(&doc)
                .iter()
                .map(|entry| normalize(entry, self.ctx.entity_type())),
            prepared.limit,
        )
    }
}

#[async_trait]
impl Connector for CellosaurusConnector {
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
            if let Some(entity) = self.lookup(&id).await {
                return self.ctx.finish([Some(entity)], 1);
            }
            if !continue_after_unresolved(&self.ctx, &id) {
                return Vec::new();
            }
        }
        self.text_search(prepared).await
    }
}

fn cell_lines(doc: &Value) -> &[Value] {
    doc.get("Cellosaurus")
        .map(|root| array_field(root, "cell-line-list"))
        .unwrap_or(&[])
}

/// Value of the entry with `preferred` type, else the first entry.
fn primary_value<'a>(list: &'a [Value], preferred: &str) -> Option<&'a str> {
    list.iter()
        .find(|entry| entry.get("type").and_then(Value::as_str) == Some(preferred))
        .or_else(|| list.first())
        .and_then(|entry| str_field(entry, "value"))
}

fn normalize(entry: &Value, entity_type: &str) -> Option<Entity> {
    let accession = primary_value(array_field(entry, "accession-list"), "primary");
    let names = array_field(entry, "name-list");
    let name = primary_value(names, "identifier");
    if accession.is_none() && name.is_none() {
        return None;
    }

    let species = unique_strings(
        array_field(entry, "species-list")
            .iter()
            .filter_map(|item| {
                str_field(item, "label")
                    .or_else(|| str_field(item, "accession"))
                    .or_else(|| str_field(item, "value"))
            })
            .map(str::to_string),
    );

    Some(
        Entity::new(
            accession.map(|acc| format!("https://www.cellosaurus.org/{acc}")),
            entity_type,
        )
        .set("name", non_blank(name))
        .set("accession", non_blank(accession))
        .set("species", species),
    )
}
