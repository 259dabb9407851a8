//! HTTP access to upstream JSON and SPARQL-results endpoints.
//!
//! [`Upstream`] is the transport seam: [`HttpUpstream`] talks to the network,
//! tests substitute their own implementation. [`UpstreamClient`] wraps either
//! and turns every failure into "no data" so a broken source never surfaces as
//! an error to callers.

use crate::config::HttpSettings;
use crate::error::ConnectorError;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const JSON_ACCEPT: &str = "application/json";
const BODY_PREVIEW_CHARS: usize = 200;

/// A single GET against an upstream endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl UpstreamRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[async_trait]
pub trait Upstream: Send + Sync {
    /// Fetch and parse one JSON document.
    async fn get_json(&self, request: &UpstreamRequest) -> Result<Value, ConnectorError>;
}

/// reqwest-backed transport shared by all connectors.
pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    pub fn new(settings: &HttpSettings) -> Result<Self, ConnectorError> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build()
            .map_err(ConnectorError::HttpRequest)?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn get_json(&self, request: &UpstreamRequest) -> Result<Value, ConnectorError> {
        let mut builder = self.client.get(&request.url);
        if request.header_value(ACCEPT.as_str()).is_none() {
            builder = builder.header(ACCEPT, JSON_ACCEPT);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(ConnectorError::HttpRequest)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ConnectorError::UpstreamStatus {
                status: status.as_u16(),
                url: request.url.clone(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.text().await.map_err(ConnectorError::HttpRequest)?;

        serde_json::from_str(&body).map_err(|e| ConnectorError::UnexpectedBody {
            url: request.url.clone(),
            reason: format!(
                "{} (content-type: {}, body starts: {:?})",
                e,
                if content_type.is_empty() { "unknown" } else { content_type.as_str() },
                body.chars().take(BODY_PREVIEW_CHARS).collect::<String>()
            ),
        })
    }
}

/// Failure-absorbing handle used by connectors.
#[derive(Clone)]
pub struct UpstreamClient {
    inner: Arc<dyn Upstream>,
    source: &'static str,
}

impl UpstreamClient {
    pub fn new(inner: Arc<dyn Upstream>, source: &'static str) -> Self {
        Self { inner, source }
    }

    /// Fetch a document, returning `None` on any transport, status or parse
    /// failure.
    pub async fn fetch_document(&self, request: UpstreamRequest) -> Option<Value> {
        match self.inner.get_json(&request).await {
            Ok(value) => {
                debug!(
                    target: "lookups.upstream",
                    source = self.source,
                    url = %request.url,
                    "fetched upstream document"
                );
                Some(value)
            }
            Err(error) => {
                warn!(
                    target: "lookups.upstream",
                    source = self.source,
                    url = %request.url,
                    code = error.code_str(),
                    %error,
                    "upstream fetch failed; treating as no data"
                );
                None
            }
        }
    }
}

/// Append URL-encoded query parameters to `base`.
pub fn with_query(base: &str, params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return base.to_string();
    }
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter())
        .finish();
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}{query}")
}

/// Percent-encode a single path segment.
pub fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}
