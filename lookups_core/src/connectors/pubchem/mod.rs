use crate::classify::{Classifier, IdPattern, QueryIntent};
use crate::config::{SourceConfig, UnresolvedIdentifier};
use crate::connectors::continue_after_unresolved;
use crate::entity::{non_blank, scalar_string, Entity};
use crate::source::{DetailCache, Prepared, SearchRequest, SourceContext, SourceSpec};
use crate::upstream::{encode_segment, with_query, Upstream};
use crate::Connector;
use async_trait::async_trait;
use futures::future::join_all;
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

const MAX_SYNONYMS: usize = 10;
const PROPERTIES: &str = "Title,InChI,InChIKey";

static SPEC: SourceSpec = SourceSpec {
    name: "pubchem",
    description: "PubChem compounds by name, CID or InChIKey",
    default_base_url: "https://pubchem.ncbi.nlm.nih.gov",
    default_type: "ChemicalSubstance",
    min_query_len: 2,
    default_limit: 10,
    unresolved_identifier: UnresolvedIdentifier::TextSearch,
    default_fields: &[],
};

static CLASSIFIER: Lazy<Classifier> = Lazy::new(|| {
    Classifier::new(vec![
        IdPattern::new("cid", r"(?i)^cid[:\s]*(?P<id>\d+)$", "PubChem CID with prefix (CID:702)"),
        IdPattern::new("cid", r"^(?P<id>\d+)$", "Bare PubChem CID (702)"),
        IdPattern::new(
            "inchikey",
            r"(?i)^(?P<id>[a-z]{14}-[a-z]{10}-[a-z])$",
            "InChIKey (LFQSCWFLJHTTHZ-UHFFFAOYSA-N)",
        )
        .normalize_with(|raw| raw.to_uppercase()),
    ])
});

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PropertyResponse {
    property_table: PropertyTable,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PropertyTable {
    #[serde(default)]
    properties: Vec<CompoundProperties>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CompoundProperties {
    #[serde(rename = "CID")]
    cid: Option<Value>,
    title: Option<String>,
    #[serde(rename = "InChI")]
    inchi: Option<String>,
    #[serde(rename = "InChIKey")]
    inchikey: Option<String>,
}

impl CompoundProperties {
    fn cid(&self) -> Option<String> {
        self.cid.as_ref().and_then(scalar_string)
    }
}

pub struct PubChemConnector {
    ctx: SourceContext,
    synonyms: DetailCache,
}

impl PubChemConnector {
    pub fn new(config: SourceConfig, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            ctx: SourceContext::new(&SPEC, config, upstream),
            synonyms: DetailCache::new(),
        }
    }

    /// `namespace` is one of `cid`, `inchikey` or `name`.
    async fn properties(&self, namespace: &str, value: &str) -> Option<CompoundProperties> {
        let url = self.ctx.url(&format!(
            "/rest/pug/compound/{namespace}/{}/property/{PROPERTIES}/JSON",
            encode_segment(value)
        ));
        let doc = self.ctx.fetch(url).await?;
        let response: PropertyResponse = serde_json::from_value(doc).ok()?;
        response
            .property_table
            .properties
            .into_iter()
            .find(|p| p.cid().is_some())
    }

    async fn synonyms(&self, cid: &str) -> Vec<String> {
        let url = self.ctx.url(&format!(
            "/rest/pug/compound/cid/{}/synonyms/JSON",
            encode_segment(cid)
        ));
        let doc = self.ctx.fetch_detail(&self.synonyms, cid, url).await;
        doc.as_deref()
            .and_then(|d| d.pointer("/InformationList/Information/0/Synonym"))
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(|s| non_blank(s.as_str()))
                    .take(MAX_SYNONYMS)
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn record(&self, props: CompoundProperties, fallback_name: Option<&str>) -> Option<Entity> {
        let cid = props.cid()?;
        let synonyms = self.synonyms(&cid).await;
        let cid_value = cid
            .parse::<u64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::from(cid.clone()));

        Some(
            Entity::new(
                Some(format!("https://pubchem.ncbi.nlm.nih.gov/compound/{cid}")),
                self.ctx.entity_type(),
            )
            .set("name", non_blank(props.title.as_deref()).or_else(|| non_blank(fallback_name)))
            .set("synonym", synonyms)
            .set("inchi", props.inchi)
            .set("inchikey", props.inchikey)
            .set("cid", cid_value),
        )
    }

    async fn by_name(&self, name: &str) -> Option<Entity> {
        let props = self.properties("name", name).await?;
        self.record(props, Some(name)).await
    }

    async fn suggestions(&self, prepared: Prepared<'_>) -> Vec<String> {
        let limit = prepared.limit.to_string();
        let url = with_query(
            &self.ctx.url(&format!(
                "/rest/autocomplete/compound/{}/json",
                encode_segment(prepared.query)
            )),
            &[("limit", limit.as_str())],
        );
        let Some(doc) = self.ctx.fetch(url).await else {
            return Vec::new();
        };
        doc.pointer("/dictionary_terms/compound")
            .and_then(Value::as_array)
            .map(|terms| terms.iter().filter_map(|t| non_blank(t.as_str())).collect())
            .unwrap_or_default()
    }

    async fn text_search(&self, prepared: Prepared<'_>) -> Vec<Entity> {
        let suggestions = self.suggestions(prepared).await;
        if suggestions.is_empty() {
            let single = self.by_name(prepared.query).await;
            return self.ctx.finish([single], prepared.limit);
        }

        let mut seen = HashSet::new();
        let mut records = Vec::new();
        for chunk in suggestions.chunks(prepared.limit) {
            let found = join_all(chunk.iter().map(|name| self.by_name(name))).await;
            for entity in found.into_iter().flatten() {
                let cid = entity.get("cid").and_then(scalar_string);
                if cid.is_some_and(|cid| seen.insert(cid)) {
                    records.push(Some(entity));
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
impl Connector for PubChemConnector {
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
        if let QueryIntent::Identifier { pattern, id } = self.classify(prepared.query) {
            let namespace = if pattern == "inchikey" { "inchikey" } else { "cid" };
            if let Some(props) = self.properties(namespace, &id).await {
                let entity = self.record(props, None).await;
                return self.ctx.finish([entity], 1);
            }
            if !continue_after_unresolved(&self.ctx, &id) {
                return Vec::new();
            }
        }
        self.text_search(prepared).await
    }
}
