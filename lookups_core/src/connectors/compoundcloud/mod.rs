//! Chemical compounds from the CompoundCloud Wikibase.
//!
//! Free text goes through the SPARQL endpoint (label or English alias
//! containment), then each candidate item is resolved through the entity-data
//! endpoint. Entity documents are memoized per Q-id.

use crate::classify::{Classifier, IdPattern, QueryIntent};
use crate::config::{SourceConfig, UnresolvedIdentifier};
use crate::connectors::continue_after_unresolved;
use crate::entity::{non_blank, Entity};
use crate::source::{DetailCache, Prepared, SearchRequest, SourceContext, SourceSpec};
use crate::upstream::{encode_segment, with_query, Upstream};
use crate::utils::{escape_sparql_string, str_at, unique_strings};
use crate::Connector;
use async_trait::async_trait;
use futures::future::join_all;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

const ENTITY_BASE: &str = "https://compoundcloud.wikibase.cloud/entity";
const LANGUAGE: &str = "en";
const MAX_SYNONYMS: usize = 20;
const SPARQL_ACCEPT: &str = "application/sparql-results+json, application/json";

/// Output field → Wikibase property holding a string value.
const STRING_PROPERTIES: &[(&str, &str)] = &[
    ("inchi", "P9"),
    ("inchikey", "P10"),
    ("smiles", "P12"),
    ("formula", "P3"),
    ("pubchemCid", "P13"),
    ("dsstoxId", "P22"),
    ("keggId", "P27"),
    ("chebiId", "P28"),
    ("chemblId", "P41"),
    ("ecNumber", "P43"),
    ("echaInfocardId", "P44"),
    ("aopWikiStressorId", "P36"),
];
const CAS_PROPERTY: &str = "P23";
const MASS_PROPERTY: &str = "P2";

static SPEC: SourceSpec = SourceSpec {
    name: "compoundcloud",
    description: "CompoundCloud Wikibase of chemical compounds (toxicology focus)",
    default_base_url: "https://compoundcloud.wikibase.cloud",
    default_type: "ChemicalSubstance",
    min_query_len: 2,
    default_limit: 10,
    unresolved_identifier: UnresolvedIdentifier::TextSearch,
    default_fields: &[],
};

static CLASSIFIER: Lazy<Classifier> = Lazy::new(|| {
    Classifier::new(vec![
        IdPattern::new(
            "entity_url",
            r"(?i)^https?://compoundcloud\.wikibase\.cloud/(?:entity/|wiki/Item:)(?P<id>q\d+)/?$",
            "CompoundCloud entity URL",
        )
        .normalize_with(|raw| raw.to_uppercase()),
        IdPattern::new("qid", r"(?i)^(?P<id>q\d+)$", "Wikibase item id (Q42)")
            .normalize_with(|raw| raw.to_uppercase()),
    ])
});

/// One SPARQL hit, deduplicated by item IRI.
#[derive(Debug, Clone, PartialEq)]
struct Candidate {
    qid: String,
    label: Option<String>,
    description: Option<String>,
}

pub struct CompoundCloudConnector {
    ctx: SourceContext,
    entities: DetailCache,
}

impl CompoundCloudConnector {
    pub fn new(config: SourceConfig, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            ctx: SourceContext::new(&SPEC, config, upstream),
            entities: DetailCache::new(),
        }
    }

    async fn entity_document(&self, qid: &str) -> Option<Arc<Value>> {
        let url = self.ctx.url(&format!(
            "/wiki/Special:EntityData/{}.json",
            encode_segment(qid)
        ));
        self.ctx.fetch_detail(&self.entities, qid, url).await
    }

    async fn candidates(&self, prepared: Prepared<'_>) -> Vec<Candidate> {
        let query = build_search_query(prepared.query, prepared.limit);
        let url = with_query(
            &self.ctx.url("/query/sparql"),
            &[("query", query.as_str()), ("format", "json")],
        );
        let request = self.ctx.request(url).header("Accept", SPARQL_ACCEPT);
        match self.ctx.fetch_request(request).await {
            Some(doc) => parse_candidates(&doc),
            None => Vec::new(),
        }
    }

    async fn text_search(&self, prepared: Prepared<'_>) -> Vec<Entity> {
        let candidates = self.candidates(prepared).await;
        let mut records = Vec::new();

        for chunk in candidates.chunks(prepared.limit) {
            let docs = join_all(chunk.iter().map(|c| self.entity_document(&c.qid))).await;
            for (candidate, doc) in chunk.iter().zip(docs) {
                let Some(doc) = doc else { continue };
                let record =
                    build_record(&doc, &candidate.qid, Some(candidate), self.ctx.entity_type());
                if record.is_some() {
                    records.push(record);
                }
            }
            if records.len() >= prepared.limit {
                break;
            }
        }

        self.ctx.finish(records, prepared.limit)
    }
}

#[async_trait]
impl Connector for CompoundCloudConnector {
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
            let record = self
                .entity_document(&id)
                .await
                .and_then(|doc| build_record(&doc, &id, None, self.ctx.entity_type()));
            if let Some(entity) = record {
                return self.ctx.finish([Some(entity)], 1);
            }
            if !continue_after_unresolved(&self.ctx, &id) {
                return Vec::new();
            }
        }
        self.text_search(prepared).await
    }
}

fn build_search_query(term: &str, limit: usize) -> String {
    let lowered = escape_sparql_string(&term.to_lowercase());
    let row_limit = (limit.clamp(1, 100) * 10).min(200);
    format!(
        r#"SELECT DISTINCT ?item ?itemLabel ?description
WHERE {{
  ?item rdfs:label ?itemLabel .
  OPTIONAL {{ ?item schema:description ?description FILTER(LANG(?description) = "{LANGUAGE}") }}
  FILTER(
    CONTAINS(LCASE(?itemLabel), "{lowered}") ||
    EXISTS {{
      ?item skos:altLabel ?synonymSearch .
      FILTER(LANG(?synonymSearch) = "{LANGUAGE}" && CONTAINS(LCASE(?synonymSearch), "{lowered}"))
    }}
  )
}}
ORDER BY LCASE(?itemLabel)
LIMIT {row_limit}"#
    )
}

/// Q-id from an item IRI (`.../entity/Q42` → `Q42`).
fn qid_from_iri(iri: &str) -> Option<String> {
    let tail = iri.trim().trim_end_matches('/').rsplit('/').next()?;
    let is_qid = tail.len() > 1
        && tail.starts_with(|c: char| c.eq_ignore_ascii_case(&'q'))
        && tail[1..].bytes().all(|b| b.is_ascii_digit());
    is_qid.then(|| tail.to_uppercase())
}

fn parse_candidates(doc: &Value) -> Vec<Candidate> {
    let bindings = doc
        .pointer("/results/bindings")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    let mut seen = HashSet::new();
    bindings
        .iter()
        .filter_map(|binding| {
            let iri = str_at(binding, "/item/value")?;
            if !seen.insert(iri.to_string()) {
                return None;
            }
            Some(Candidate {
                qid: qid_from_iri(iri)?,
                label: non_blank(str_at(binding, "/itemLabel/value")),
                description: non_blank(str_at(binding, "/description/value")),
            })
        })
        .collect()
}

/// Main-snak values of every statement for `property`.
fn claim_values<'a>(entity: &'a Value, property: &str) -> impl Iterator<Item = &'a Value> {
    entity
        .pointer(&format!("/claims/{property}"))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|statement| statement.pointer("/mainsnak/datavalue/value"))
}

fn first_string_claim(entity: &Value, property: &str) -> Option<String> {
    claim_values(entity, property).find_map(|v| non_blank(v.as_str()))
}

fn quantity_claim(entity: &Value, property: &str) -> Option<f64> {
    claim_values(entity, property).find_map(|v| {
        let amount = v.get("amount")?;
        match amount {
            Value::String(s) => s.trim().parse::<f64>().ok(),
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
        .filter(|n| n.is_finite())
    })
}

fn aliases(entity: &Value) -> Vec<String> {
    let groups = entity.get("aliases").and_then(Value::as_object);
    unique_strings(
        groups
            .into_iter()
            .flat_map(|map| map.values())
            .filter_map(Value::as_array)
            .flatten()
            .filter_map(|alias| alias.get("value").and_then(Value::as_str))
            .map(str::to_string),
    )
}

fn label(entity: &Value, fallback: Option<&str>) -> Option<String> {
    non_blank(str_at(entity, &format!("/labels/{LANGUAGE}/value")))
        .or_else(|| non_blank(fallback))
        .or_else(|| {
            entity
                .get("labels")
                .and_then(Value::as_object)
                .and_then(|labels| labels.values().find_map(|l| non_blank(l.get("value")?.as_str())))
        })
}

/// Build a record from an entity-data document (`{"entities": {"Q..": {..}}}`).
fn build_record(
    doc: &Value,
    qid: &str,
    candidate: Option<&Candidate>,
    entity_type: &str,
) -> Option<Entity> {
    let entities = doc.get("entities")?;
    let entity = entities.get(qid).or_else(|| {
        // Redirected items come back under their target id
        entities.as_object().filter(|m| m.len() == 1)?.values().next()
    })?;
    let wikibase_id = non_blank(entity.get("id").and_then(Value::as_str))?;
    let name = label(entity, candidate.and_then(|c| c.label.as_deref()))?;

    let description = candidate
        .and_then(|c| c.description.clone())
        .or_else(|| non_blank(str_at(entity, &format!("/descriptions/{LANGUAGE}/value"))));
    let synonyms: Vec<String> = aliases(entity).into_iter().take(MAX_SYNONYMS).collect();
    let cas = unique_strings(
        claim_values(entity, CAS_PROPERTY)
            .filter_map(Value::as_str)
            .map(str::to_string),
    );

    let mut record = Entity::new(Some(format!("{ENTITY_BASE}/{wikibase_id}")), entity_type)
        .set("name", name)
        .set("description", description)
        .set("synonym", synonyms);
    for (field, property) in STRING_PROPERTIES {
        record = record.set(field, first_string_claim(entity, property));
    }
    Some(
        record
            .set("cas", cas)
            .set("mass", quantity_claim(entity, MASS_PROPERTY))
            .set("wikibaseId", wikibase_id),
    )
}
