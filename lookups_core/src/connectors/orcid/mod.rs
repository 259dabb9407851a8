use crate::classify::{Classifier, IdPattern, QueryIntent};
use crate::config::{SourceConfig, UnresolvedIdentifier};
use crate::connectors::continue_after_unresolved;
use crate::entity::{non_blank, Entity};
use crate::source::{SearchRequest, SourceContext, SourceSpec};
use crate::upstream::{with_query, Upstream};
use crate::Connector;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

const MAX_ROWS: usize = 50;
const MAX_AFFILIATIONS: usize = 5;

static SPEC: SourceSpec = SourceSpec {
    name: "orcid",
    description: "ORCID researcher identifiers (public expanded search)",
    default_base_url: "https://pub.orcid.org",
    default_type: "Person",
    min_query_len: 2,
    default_limit: 10,
    unresolved_identifier: UnresolvedIdentifier::TextSearch,
    default_fields: &[],
};

static CLASSIFIER: Lazy<Classifier> = Lazy::new(|| {
    Classifier::new(vec![IdPattern::new(
        "orcid",
        r"(?i)^(?:https?://(?:www\.)?orcid\.org/)?(?P<id>\d{4}-\d{4}-\d{4}-\d{3}[\dx])/?$",
        "ORCID iD, bare or as URL (0000-0002-1825-0097)",
    )
    .normalize_with(|raw| raw.to_uppercase())])
});

#[derive(Debug, Default, Deserialize)]
struct ExpandedSearch {
    #[serde(rename = "expanded-result", default)]
    expanded_result: Option<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
struct ExpandedResult {
    orcid_id: Option<String>,
    given_names: Option<String>,
    family_names: Option<String>,
    institution_name: Option<Vec<Option<String>>>,
}

pub struct OrcidConnector {
    ctx: SourceContext,
}

impl OrcidConnector {
    pub fn new(config: SourceConfig, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            ctx: SourceContext::new(&SPEC, config, upstream),
        }
    }

    async fn expanded_search(&self, q: &str, limit: usize) -> Vec<Option<Entity>> {
        let rows = limit.clamp(1, MAX_ROWS).to_string();
        let url = with_query(
            &self.ctx.url("/v3.0/expanded-search/"),
            &[("q", q), ("rows", rows.as_str())],
        );
        let Some(doc) = self.ctx.fetch(url).await else {
            return Vec::new();
        };
        serde_json::from_value::<ExpandedSearch>(doc)
            .ok()
            .and_then(|search| search.expanded_result)
            .unwrap_or_default()
            .into_iter()
            .take(limit)
            .map(|entry| normalize(&entry, self.ctx.entity_type()))
            .collect()
    }
}

#[async_trait]
impl Connector for OrcidConnector {
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
            let found = self.ctx.finish(self.expanded_search(&format!("orcid:{id}"), 1).await, 1);
            if !found.is_empty() {
                return found;
            }
            if !continue_after_unresolved(&self.ctx, &id) {
                return Vec::new();
            }
        }
        let entries = self.expanded_search(prepared.query, prepared.limit).await;
        self.ctx.finish(entries, prepared.limit)
    }
}

fn normalize(raw: &Value, entity_type: &str) -> Option<Entity> {
    let entry: ExpandedResult = serde_json::from_value(raw.clone()).ok()?;
    let orcid = non_blank(entry.orcid_id.as_deref())?;
    let given = non_blank(entry.given_names.as_deref());
    let family = non_blank(entry.family_names.as_deref());

    let full_name = [given.as_deref(), family.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    let affiliations: Vec<String> = entry
        .institution_name
        .unwrap_or_default()
        .into_iter()
        .filter_map(|name| non_blank(name.as_deref()))
        .take(MAX_AFFILIATIONS)
        .collect();

    Some(
        Entity::new(Some(format!("https://orcid.org/{orcid}")), entity_type)
            .set("name", non_blank(Some(full_name.as_str())).unwrap_or_else(|| orcid.clone()))
            .set("givenName", given)
            .set("familyName", family)
            .set("affiliation", affiliations),
    )
}
