//! Identifier detection for lookup queries.
//!
//! Each connector owns an ordered table of [`IdPattern`]s. The first pattern
//! that matches a trimmed query wins and its `id` capture group, passed through
//! the pattern's normalizer, becomes the identifier to resolve. Queries that
//! match nothing are free text.
//!
//! # Example
//!
//! ```rust
//! use lookups_core::classify::{Classifier, IdPattern, QueryIntent};
//!
//! let classifier = Classifier::new(vec![IdPattern::new(
//!     "aop_prefixed",
//!     r"(?i)\baop[-_\s:]*(?P<id>\d+)",
//!     "AOP number with prefix (AOP:12, aop-12)",
//! )]);
//!
//! assert_eq!(
//!     classifier.classify("AOP:12"),
//!     QueryIntent::Identifier { pattern: "aop_prefixed", id: "12".to_string() }
//! );
//! assert_eq!(classifier.classify("liver fibrosis"), QueryIntent::Text("liver fibrosis".to_string()));
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};

/// What a query should be treated as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum QueryIntent {
    /// A direct identifier in the source's namespace.
    Identifier { pattern: &'static str, id: String },
    /// Anything else, searched as text.
    Text(String),
}

impl QueryIntent {
    pub fn identifier(&self) -> Option<&str> {
        match self {
            QueryIntent::Identifier { id, .. } => Some(id),
            QueryIntent::Text(_) => None,
        }
    }

    pub fn is_identifier(&self) -> bool {
        matches!(self, QueryIntent::Identifier { .. })
    }
}

/// One entry of a connector's identifier table.
#[derive(Clone)]
pub struct IdPattern {
    /// Stable name for this pattern (shows up in logs and `classify` output)
    pub id: &'static str,
    /// Must define an `id` capture group
    pub pattern: Regex,
    /// Canonicalizes the captured text (case, prefixes)
    pub normalize: fn(&str) -> String,
    pub description: &'static str,
}

impl IdPattern {
    /// Build a pattern from a static regex. Panics on an invalid expression,
    /// which can only come from a programming error in a pattern table.
    pub fn new(id: &'static str, pattern: &str, description: &'static str) -> Self {
        let pattern = Regex::new(pattern)
            .unwrap_or_else(|e| panic!("invalid identifier pattern {id}: {e}"));
        Self {
            id,
            pattern,
            normalize: |raw| raw.to_string(),
            description,
        }
    }

    pub fn normalize_with(mut self, normalize: fn(&str) -> String) -> Self {
        self.normalize = normalize;
        self
    }

    fn extract(&self, input: &str) -> Option<String> {
        let captures = self.pattern.captures(input)?;
        let raw = captures
            .name("id")
            .or_else(|| captures.get(0))?
            .as_str()
            .trim();
        if raw.is_empty() {
            return None;
        }
        Some((self.normalize)(raw))
    }
}

impl std::fmt::Debug for IdPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdPattern")
            .field("id", &self.id)
            .field("pattern", &self.pattern.as_str())
            .finish()
    }
}

/// Information about a pattern for documentation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternInfo {
    pub id: String,
    pub pattern: String,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct Classifier {
    patterns: Vec<IdPattern>,
}

impl Classifier {
    pub fn new(patterns: Vec<IdPattern>) -> Self {
        Self { patterns }
    }

    pub fn classify(&self, query: &str) -> QueryIntent {
        let query = query.trim();
        for pattern in &self.patterns {
            if let Some(id) = pattern.extract(query) {
                return QueryIntent::Identifier {
                    pattern: pattern.id,
                    id,
                };
            }
        }
        QueryIntent::Text(query.to_string())
    }

    pub fn patterns(&self) -> &[IdPattern] {
        &self.patterns
    }

    pub fn describe(&self) -> Vec<PatternInfo> {
        self.patterns
            .iter()
            .map(|p| PatternInfo {
                id: p.id.to_string(),
                pattern: p.pattern.as_str().to_string(),
                description: p.description.to_string(),
            })
            .collect()
    }
}
