use crate::classify::{Classifier, IdPattern, QueryIntent};
use crate::config::{SourceConfig, UnresolvedIdentifier};
use crate::connectors::continue_after_unresolved;
use crate::entity::{non_blank, Entity};
use crate::source::{Prepared, SearchRequest, SourceContext, SourceSpec};
use crate::upstream::{encode_segment, with_query, Upstream};
use crate::utils::unique_strings;
use crate::Connector;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// The v2 API ignores page sizes and always answers with 20 items.
const MAX_RESULTS: usize = 20;

static SPEC: SourceSpec = SourceSpec {
    name: "ror",
    description: "Research Organization Registry: universities, institutes and funders",
    default_base_url: "https://api.ror.org",
    default_type: "Organization",
    min_query_len: 2,
    default_limit: 20,
    unresolved_identifier: UnresolvedIdentifier::TextSearch,
    default_fields: &[],
};

static CLASSIFIER: Lazy<Classifier> = Lazy::new(|| {
    Classifier::new(vec![
        IdPattern::new(
            "ror_url",
            r"(?i)^(?:https?://)?(?:www\.)?ror\.org/(?P<id>0[a-z0-9]{6}[0-9]{2})/?$",
            "ROR URL (https://ror.org/02mhbdp94)",
        )
        .normalize_with(|raw| raw.to_lowercase()),
        IdPattern::new(
            "ror_id",
            r"(?i)^(?P<id>0[a-hj-km-np-tv-z0-9]{6}[0-9]{2})$",
            "Bare ROR identifier (02mhbdp94)",
        )
        .normalize_with(|raw| raw.to_lowercase()),
    ])
});

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Organization {
    id: Option<String>,
    name: Option<String>,
    names: Vec<OrganizationName>,
    acronyms: Vec<String>,
    aliases: Vec<String>,
    links: Vec<Value>,
    locations: Vec<Location>,
    established: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OrganizationName {
    types: Vec<String>,
    value: String,
}

impl OrganizationName {
    fn has_type(&self, kind: &str) -> bool {
        self.types.iter().any(|t| t == kind)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Location {
    geonames_details: Option<GeonamesDetails>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GeonamesDetails {
    name: Option<String>,
    country_name: Option<String>,
}

pub struct RorConnector {
    ctx: SourceContext,
}

impl RorConnector {
    pub fn new(config: SourceConfig, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            ctx: SourceContext::new(&SPEC, config, upstream),
        }
    }

    async fn lookup(&self, id: &str) -> Option<Entity> {
        let url = self.ctx.url(&format!("/v2/organizations/{}", encode_segment(id)));
        let doc = self.ctx.fetch(url).await?;
        normalize(&doc, self.ctx.entity_type())
    }

    async fn text_search(&self, prepared: Prepared<'_>) -> Vec<Entity> {
        let url = with_query(
            &self.ctx.url("/v2/organizations"),
            &[("query", prepared.query), ("page", "1")],
        );
        let Some(doc) = self.ctx.fetch(url).await else {
            return Vec::new();
        };
        let items = serde_json::from_value::<SearchResponse>(doc)
            .map(|response| response.items)
            .unwrap_or_default();
        let cap = prepared.limit.min(MAX_RESULTS);

        self.ctx.finish(
            items
                .iter()
                .take(cap)
                .map(|item| normalize(item, self.ctx.entity_type())),
            cap,
        )
    }
}

#[async_trait]
impl Connector for RorConnector {
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

/// Map one v2 (or legacy v1) organization record.
fn normalize(raw: &Value, entity_type: &str) -> Option<Entity> {
    let org: Organization = serde_json::from_value(raw.clone()).ok()?;
    let id = non_blank(org.id.as_deref())?;

    let display = org
        .names
        .iter()
        .find(|n| n.has_type("ror_display"))
        .map(|n| n.value.clone())
        .or_else(|| org.name.clone());

    let acronym = org
        .names
        .iter()
        .find(|n| n.has_type("acronym"))
        .map(|n| n.value.clone())
        .or_else(|| org.acronyms.first().cloned());

    let alternate_names = unique_strings(
        org.names
            .iter()
            .filter(|n| n.has_type("alias") || n.has_type("label"))
            .map(|n| n.value.clone())
            .chain(org.aliases.iter().cloned())
            .filter(|v| Some(v) != display.as_ref()),
    );

    let website = org.links.iter().find_map(|link| match link {
        Value::String(s) => non_blank(Some(s.as_str())),
        Value::Object(map) => {
            let kind = map.get("type").and_then(Value::as_str);
            if kind.is_none() || kind == Some("website") {
                non_blank(map.get("value").and_then(Value::as_str))
            } else {
                None
            }
        }
        _ => None,
    });

    let location = org
        .locations
        .iter()
        .find_map(|loc| loc.geonames_details.as_ref())
        .map(|geo| {
            [geo.name.as_deref(), geo.country_name.as_deref()]
                .into_iter()
                .flatten()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", ")
        });

    Some(
        Entity::new(Some(id), entity_type)
            .set("name", display)
            .set("acronym", acronym)
            .set("alternateName", alternate_names)
            .set("url", website)
            .set("location", location)
            .set("foundingDate", org.established.map(|year| year.to_string())),
    )
}
