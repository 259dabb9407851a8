//! Scholarly works from the Crossref REST API.
//!
//! DOIs (bare, `doi:`-prefixed, embedded in text or as `doi.org` URLs) are
//! fetched directly from `/works/{doi}`; anything else is a bibliographic
//! query against `/works`. An unresolved DOI returns nothing by default.

use crate::classify::{Classifier, IdPattern, QueryIntent};
use crate::config::{SourceConfig, UnresolvedIdentifier};
use crate::connectors::continue_after_unresolved;
use crate::entity::{non_blank, scalar_string, Entity};
use crate::source::{Prepared, SearchRequest, SourceContext, SourceSpec};
use crate::upstream::{encode_segment, with_query, Upstream};
use crate::Connector;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

const MAX_ROWS: usize = 20;

static SPEC: SourceSpec = SourceSpec {
    name: "crossref",
    description: "Crossref scholarly works by DOI or bibliographic query",
    default_base_url: "https://api.crossref.org",
    default_type: "ScholarlyArticle",
    min_query_len: 3,
    default_limit: 10,
    unresolved_identifier: UnresolvedIdentifier::Empty,
    default_fields: &[],
};

static CLASSIFIER: Lazy<Classifier> = Lazy::new(|| {
    Classifier::new(vec![
        IdPattern::new(
            "doi_url",
            r"(?i)^https?://(?:dx\.)?doi\.org/+(?P<id>\S+)$",
            "DOI resolver URL (https://doi.org/10.1000/xyz123)",
        ),
        IdPattern::new(
            "doi_prefixed",
            r"(?i)^doi:\s*(?P<id>10\.\d{4,9}/[-._;()/:a-z0-9]+)",
            "DOI with doi: prefix",
        ),
        IdPattern::new(
            "doi",
            r"(?i)(?P<id>10\.\d{4,9}/[-._;()/:a-z0-9]+)",
            "DOI anywhere in the query (10.1000/xyz123)",
        ),
    ])
});

#[derive(Debug, Deserialize)]
struct WorkEnvelope {
    message: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WorkList {
    items: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct Work {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    title: Vec<String>,
    author: Vec<Author>,
    container_title: Vec<String>,
    published_print: Option<DateParts>,
    published_online: Option<DateParts>,
    issued: Option<DateParts>,
    published: Option<DateParts>,
    volume: Option<Value>,
    issue: Option<Value>,
    page: Option<Value>,
    #[serde(rename = "ISSN")]
    issn: Vec<String>,
    issn_type: Vec<IssnType>,
    publisher: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Author {
    given: Option<String>,
    family: Option<String>,
    name: Option<String>,
    #[serde(rename = "ORCID")]
    orcid: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IssnType {
    value: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DateParts {
    #[serde(rename = "date-parts")]
    date_parts: Vec<Vec<Value>>,
}

impl DateParts {
    /// `YYYY`, `YYYY-MM` or `YYYY-MM-DD` from the first date-parts entry.
    fn format(&self) -> Option<String> {
        let parts: Vec<Option<i64>> = self
            .date_parts
            .first()?
            .iter()
            .map(|part| scalar_string(part).and_then(|s| s.parse().ok()))
            .collect();
        let year = parts.first().copied().flatten().filter(|y| *y != 0)?;
        let month = parts.get(1).copied().flatten().filter(|m| *m != 0);
        let day = parts.get(2).copied().flatten().filter(|d| *d != 0);
        Some(match (month, day) {
            (None, _) => year.to_string(),
            (Some(month), None) => format!("{year}-{month:02}"),
            (Some(month), Some(day)) => format!("{year}-{month:02}-{day:02}"),
        })
    }

    fn year(&self) -> Option<String> {
        self.date_parts.first()?.first().and_then(scalar_string)
    }
}

pub struct CrossrefConnector {
    ctx: SourceContext,
}

impl CrossrefConnector {
    pub fn new(config: SourceConfig, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            ctx: SourceContext::new(&SPEC, config, upstream),
        }
    }

    async fn by_doi(&self, doi: &str) -> Option<Entity> {
        let url = self.ctx.url(&format!(
            "/works/{}",
            encode_segment(&doi.to_lowercase())
        ));
        let doc = self.ctx.fetch(url).await?;
        let envelope: WorkEnvelope = serde_json::from_value(doc).ok()?;
        normalize(&envelope.message, self.ctx.entity_type())
    }

    async fn text_search(&self, prepared: Prepared<'_>) -> Vec<Entity> {
        let rows = prepared.limit.clamp(1, MAX_ROWS).to_string();
        let url = with_query(
            &self.ctx.url("/works"),
            &[("query", prepared.query), ("rows", rows.as_str())],
        );
        let Some(doc) = self.ctx.fetch(url).await else {
            return Vec::new();
        };
        let items = doc
            .get("message")
            .cloned()
            .and_then(|message| serde_json::from_value::<WorkList>(message).ok())
            .unwrap_or_default()
            .items;
        self.ctx.finish(
            items
                .iter()
                .take(prepared.limit)
                .map(|work| normalize(work, self.ctx.entity_type())),
            prepared.limit,
        )
    }
}

#[async_trait]
impl Connector for CrossrefConnector {
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
            if let Some(entity) = self.by_doi(&id).await {
                return self.ctx.finish([Some(entity)], 1);
            }
            if !continue_after_unresolved(&self.ctx, &id) {
                return Vec::new();
            }
        }
        self.text_search(prepared).await
    }
}

fn format_authors(authors: &[Author]) -> Vec<Value> {
    authors
        .iter()
        .filter_map(|author| {
            let given = non_blank(author.given.as_deref());
            let family = non_blank(author.family.as_deref());
            let label = [given.as_deref(), family.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            let name = non_blank(Some(label.as_str())).or_else(|| non_blank(author.name.as_deref()));
            let id = non_blank(author.orcid.as_deref()).map(|orcid| orcid.replace("http://", "https://"));
            if id.is_none() && name.is_none() {
                return None;
            }

            let mut person = Map::new();
            if let Some(id) = id {
                person.insert("@id".into(), json!(id));
            }
            person.insert("@type".into(), json!("Person"));
            for (key, value) in [("name", name), ("givenName", given), ("familyName", family)] {
                if let Some(value) = value {
                    person.insert(key.into(), json!(value));
                }
            }
            Some(Value::Object(person))
        })
        .collect()
}

fn format_date(work: &Work) -> Option<String> {
    [&work.published_print, &work.published_online, &work.issued]
        .into_iter()
        .flatten()
        .find_map(DateParts::format)
        .or_else(|| work.published.as_ref().and_then(DateParts::year))
}

struct Citation<'a> {
    authors: &'a [Value],
    title: Option<&'a str>,
    journal: Option<&'a str>,
    volume: Option<String>,
    issue: Option<String>,
    pages: Option<String>,
    year: Option<&'a str>,
    doi_url: Option<&'a str>,
}

impl Citation<'_> {
    fn render(&self) -> String {
        let names: Vec<&str> = self
            .authors
            .iter()
            .filter_map(|a| a.get("name").and_then(Value::as_str))
            .collect();
        let pieces = [
            (!names.is_empty()).then(|| names.join(", ")),
            self.title.map(|t| format!("\"{t}\"")),
            self.journal.map(str::to_string),
            self.volume.as_ref().map(|v| format!("vol. {v}")),
            self.issue.as_ref().map(|i| format!("no. {i}")),
            self.pages.as_ref().map(|p| format!("pp. {p}")),
            self.year.map(str::to_string),
            self.doi_url.map(|doi| {
                let bare = doi
                    .strip_prefix("https://")
                    .or_else(|| doi.strip_prefix("http://"))
                    .unwrap_or(doi);
                format!("doi: {bare}")
            }),
        ];
        pieces.into_iter().flatten().collect::<Vec<_>>().join(", ")
    }
}

fn normalize(raw: &Value, entity_type: &str) -> Option<Entity> {
    let work: Work = serde_json::from_value(raw.clone()).ok()?;
    let doi_url = non_blank(work.doi.as_deref()).map(|doi| format!("https://doi.org/{doi}"));
    let title = work.title.iter().find_map(|t| non_blank(Some(t.as_str())));
    let journal = work.container_title.iter().find_map(|t| non_blank(Some(t.as_str())));
    let authors = format_authors(&work.author);
    let date_published = format_date(&work);
    let issn = work
        .issn
        .iter()
        .find_map(|s| non_blank(Some(s.as_str())))
        .or_else(|| work.issn_type.iter().find_map(|t| non_blank(t.value.as_deref())));

    let credit_text = Citation {
        authors: &authors,
        title: title.as_deref(),
        journal: journal.as_deref(),
        volume: work.volume.as_ref().and_then(scalar_string),
        issue: work.issue.as_ref().and_then(scalar_string),
        pages: work.page.as_ref().and_then(scalar_string),
        year: date_published.as_deref().map(|d| d.get(..4).unwrap_or(d)),
        doi_url: doi_url.as_deref(),
    }
    .render();

    Some(
        Entity::new(doi_url.clone(), entity_type)
            .set("name", title)
            .set("author", authors)
            .set("identifier", doi_url)
            .set("issn", issn)
            .set("journal", journal)
            .set("datePublished", date_published)
            .set("creditText", credit_text)
            .set("publisher", non_blank(work.publisher.as_deref())),
    )
}
