use crate::classify::{Classifier, IdPattern, QueryIntent};
use crate::config::{SourceConfig, UnresolvedIdentifier};
use crate::connectors::continue_after_unresolved;
use crate::entity::Entity;
use crate::source::{DocumentCell, Prepared, SearchRequest, SourceContext, SourceSpec};
use crate::upstream::Upstream;
use crate::utils::{matches_any, string_list, str_field};
use crate::Connector;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::sync::Arc;

static SPEC: SourceSpec = SourceSpec {
    name: "mimetypes",
    description: "Media types from the mime-db table",
    default_base_url: "https://cdn.jsdelivr.net/gh/jshttp/mime-db@1.52.0",
    default_type: "MediaType",
    min_query_len: 1,
    default_limit: 10,
    unresolved_identifier: UnresolvedIdentifier::TextSearch,
    default_fields: &[],
};

static CLASSIFIER: Lazy<Classifier> = Lazy::new(|| {
    Classifier::new(vec![IdPattern::new(
        "media_type",
        r"(?i)^(?P<id>[a-z0-9][a-z0-9!#$&^_.+-]*/[a-z0-9][a-z0-9!#$&^_.+-]*)$",
        "Media type key (application/json)",
    )
    .normalize_with(|raw| raw.to_lowercase())])
});

pub struct MimeTypesConnector {
    ctx: SourceContext,
    table: DocumentCell,
}

impl MimeTypesConnector {
    pub fn new(config: SourceConfig, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            ctx: SourceContext::new(&SPEC, config, upstream),
            table: DocumentCell::new(),
        }
    }

    async fn table(&self) -> Option<Arc<Value>> {
        self.ctx.fetch_once(&self.table, self.ctx.url("/db.json")).await
    }

    fn text_search(&self, table: &Value, prepared: Prepared<'_>) -> Vec<Entity> {
        let Some(entries) = table.as_object() else {
            return Vec::new();
        };
        let needle = prepared.query.to_lowercase();
        let matches = entries.iter().filter(|(mime, meta)| {
            let extensions = dotted_extensions(meta);
            matches_any(
                std::iter::once(Some(mime.as_str())).chain(extensions.iter().map(|e| Some(e.as_str()))),
                &needle,
            )
        });
        self.ctx.finish(
            matches.map(|(mime, meta)| Some(normalize(mime, meta, self.ctx.entity_type()))),
            prepared.limit,
        )
    }
}

#[async_trait]
impl Connector for MimeTypesConnector {
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
        let Some(table) = self.table().await else {
            return Vec::new();
        };
        if let QueryIntent::Identifier { id, .. } = self.classify(prepared.query) {
            if let Some(meta) = table.get(&id) {
                let entity = normalize(&id, meta, self.ctx.entity_type());
                return self.ctx.finish([Some(entity)], 1);
            }
            if !continue_after_unresolved(&self.ctx, &id) {
                return Vec::new();
            }
        }
        self.text_search(&table, prepared)
    }
}

fn dotted_extensions(meta: &Value) -> Vec<String> {
    string_list(meta, "extensions")
        .into_iter()
        .map(|ext| format!(".{}", ext.trim_start_matches('.')))
        .collect()
}

fn normalize(mime: &str, meta: &Value, entity_type: &str) -> Entity {
    Entity::new(Some(format!("urn:mimetype:{mime}")), entity_type)
        .set("name", mime)
        .set(
            "description",
            str_field(meta, "source").map(|source| format!("Source: {source}")),
        )
        .set("extensions", dotted_extensions(meta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_table_entry() {
        let meta = json!({"source": "iana", "compressible": true, "extensions": ["json", "map"]});
        let entity = normalize("application/json", &meta, "MediaType").cleaned();
        assert_eq!(entity.id(), Some("urn:mimetype:application/json"));
        assert_eq!(entity.name(), Some("application/json"));
        assert_eq!(entity.get_str("description"), Some("Source: iana"));
        assert_eq!(entity.get("extensions"), Some(&json!([".json", ".map"])));
    }

    #[test]
    fn entry_without_metadata_keeps_identity() {
        let entity = normalize("application/x-custom", &json!({}), "MediaType").cleaned();
        let keys: Vec<_> = entity.keys().collect();
        assert_eq!(keys, vec!["@id", "@type", "name"]);
    }

    #[test]
    fn classifies_media_type_keys() {
        assert_eq!(
            CLASSIFIER.classify("Application/JSON").identifier(),
            Some("application/json")
        );
        assert_eq!(
            CLASSIFIER.classify("application/vnd.api+json").identifier(),
            Some("application/vnd.api+json")
        );
        assert!(!CLASSIFIER.classify("json").is_identifier());
        assert!(!CLASSIFIER.classify("text / plain").is_identifier());
    }
}
