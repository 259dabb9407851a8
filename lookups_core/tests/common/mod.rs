#![allow(dead_code)]

use async_trait::async_trait;
use lookups_core::error::ConnectorError;
use lookups_core::upstream::{Upstream, UpstreamRequest};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

enum Reply {
    Json(Value),
    Status(u16),
}

/// In-memory transport: the first route whose fragment occurs in the URL
/// answers; unrouted URLs get a 404.
#[derive(Default)]
pub struct StubUpstream {
    routes: Vec<(String, Reply)>,
    delay: Option<Duration>,
    calls: Mutex<Vec<UpstreamRequest>>,
}

impl StubUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, fragment: &str, body: Value) -> Self {
        self.routes.push((fragment.to_string(), Reply::Json(body)));
        self
    }

    pub fn fail(mut self, fragment: &str, status: u16) -> Self {
        self.routes.push((fragment.to_string(), Reply::Status(status)));
        self
    }

    /// Hold every response back so concurrent callers overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn urls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|request| request.url.clone())
            .collect()
    }

    pub fn requests(&self) -> Vec<UpstreamRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn count(&self, fragment: &str) -> usize {
        self.urls().iter().filter(|url| url.contains(fragment)).count()
    }
}

#[async_trait]
impl Upstream for StubUpstream {
    async fn get_json(&self, request: &UpstreamRequest) -> Result<Value, ConnectorError> {
        self.calls.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let reply = self
            .routes
            .iter()
            .find(|(fragment, _)| request.url.contains(fragment.as_str()))
            .map(|(_, reply)| reply);
        match reply {
            Some(Reply::Json(body)) => Ok(body.clone()),
            Some(Reply::Status(status)) => Err(ConnectorError::UpstreamStatus {
                status: *status,
                url: request.url.clone(),
            }),
            None => Err(ConnectorError::UpstreamStatus {
                status: 404,
                url: request.url.clone(),
            }),
        }
    }
}
