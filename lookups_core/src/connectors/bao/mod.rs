use crate::classify::{Classifier, IdPattern, QueryIntent};
use crate::config::{SourceConfig, UnresolvedIdentifier};
use crate::connectors::continue_after_unresolved;
use crate::entity::Entity;
use crate::source::{Prepared, SearchRequest, SourceContext, SourceSpec};
use crate::upstream::{with_query, Upstream};
use crate::utils::{array_field, str_field, string_list};
use crate::Connector;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

static SPEC: SourceSpec = SourceSpec {
    name: "bao",
    description: "BioAssay Ontology terms via the EBI Ontology Lookup Service",
    default_base_url: "https://www.ebi.ac.uk/ols4",
    default_type: "BAOTerm",
    min_query_len: 2,
    default_limit: 10,
    unresolved_identifier: UnresolvedIdentifier::TextSearch,
    default_fields: &[
        "@id",
        "name",
        "description",
        "synonym",
        "oboId",
        "shortForm",
        "curie",
        "ontologyName",
    ],
};

static CLASSIFIER: Lazy<Classifier> = Lazy::new(|| {
    Classifier::new(vec![
        IdPattern::new(
            "bao_iri",
            r"(?i)^https?://www\.bioassayontology\.org/bao#bao_(?P<id>\d+)$",
            "BAO term IRI",
        )
        .normalize_with(|raw| format!("BAO:{raw}")),
        IdPattern::new(
            "bao_id",
            r"(?i)^bao[_:](?P<id>\d+)$",
            "BAO identifier (BAO_0000015, BAO:0000015)",
        )
        .normalize_with(|raw| format!("BAO:{raw}")),
    ])
});

pub struct BaoConnector {
    ctx: SourceContext,
}

impl BaoConnector {
    pub fn new(config: SourceConfig, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            ctx: SourceContext::new(&SPEC, config, upstream),
        }
    }

    async fn lookup(&self, obo_id: &str) -> Option<Entity> {
        let url = with_query(
            &self.ctx.url("/api/ontologies/bao/terms"),
            &[("obo_id", obo_id)],
        );
        let doc = self.ctx.fetch(url).await?;
        doc.pointer("/_embedded/terms")
            .and_then(Value::as_array)?
            .iter()
            .find_map(|term| normalize(term, self.ctx.entity_type()))
    }

    async fn text_search(&self, prepared: Prepared<'_>) -> Vec<Entity> {
        let rows = prepared.limit.saturating_mul(4).min(100).to_string();
        let url = with_query(
            &self.ctx.url("/api/search"),
            &[
                ("q", prepared.query),
                ("ontology", "bao"),
                ("rows", rows.as_str()),
                ("start", "0"),
                ("type", "class"),
            ],
        );
        let Some(doc) = self.ctx.fetch(url).await else {
            return Vec::new();
        };
        let docs = doc
            .get("response")
            .map(|response| array_field(response, "docs"))
            .unwrap_or(&[]);

        let mut seen = HashSet::new();
        self.ctx.finish(
            docs.iter()
                .filter(|d| str_field(d, "iri").is_some_and(|iri| seen.insert(iri.to_string())))
                .map(|d| normalize(d, self.ctx.entity_type())),
            prepared.limit,
        )
    }
}

#[async_trait]
impl Connector for BaoConnector {
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

/// Map an OLS search doc or term document. Both `iri` and `label` are
/// required.
fn normalize(doc: &Value, entity_type: &str) -> Option<Entity> {
    let iri = str_field(doc, "iri")?;
    let label = str_field(doc, "label")?;

    let description = string_list(doc, "description").into_iter().next();
    // search docs use `synonym`, term documents `synonyms`
    let mut synonyms = string_list(doc, "synonym");
    if synonyms.is_empty() {
        synonyms = string_list(doc, "synonyms");
    }
    let short_form = str_field(doc, "short_form");
    let obo_id = str_field(doc, "obo_id").or(short_form);
    let curie = str_field(doc, "curie").or(obo_id);

    Some(
        Entity::new(Some(iri.to_string()), entity_type)
            .set("name", label)
            .set("description", description)
            .set("synonym", synonyms)
            .set("shortForm", short_form)
            .set("oboId", obo_id)
            .set("curie", curie)
            .set("ontologyName", str_field(doc, "ontology_name"))
            .set("ontologyIri", str_field(doc, "ontology_iri"))
            .set(
                "isObsolete",
                doc.get("is_obsolete").and_then(Value::as_bool).unwrap_or(false),
            ),
    )
}
