//! Endpoint scope for API keys
//!
//! Callers may send allowed endpoints either as a single (comma separated)
//! string or as an array of strings. [`EndpointList`] accepts both shapes at the
//! boundary and [`EndpointList::resolve`] turns them into the ordered list of
//! patterns the core works with.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Endpoint list as received from callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EndpointList {
    /// A single pattern, or several separated by commas
    One(String),
    /// Explicit list of patterns
    Many(Vec<String>),
}

impl EndpointList {
    /// Resolve into an ordered, de-duplicated list of patterns.
    ///
    /// `None` and blank entries resolve to an empty list (unrestricted).
    pub fn resolve(list: Option<Self>) -> Vec<String> {
        let raw: Vec<String> = match list {
            None => Vec::new(),
            Some(Self::One(value)) => value.split(',').map(str::to_string).collect(),
            Some(Self::Many(values)) => values,
        };

        let mut patterns: Vec<String> = Vec::with_capacity(raw.len());

        for entry in raw {
            let trimmed = entry.trim();

            if trimmed.is_empty() || patterns.iter().any(|p| p == trimmed) {
                continue;
            }

            patterns.push(trimmed.to_string());
        }

        patterns
    }
}

impl From<Vec<&str>> for EndpointList {
    fn from(values: Vec<&str>) -> Self {
        Self::Many(values.into_iter().map(str::to_string).collect())
    }
}

/// Resolved endpoint patterns, compiled once.
///
/// `*` matches exactly one path segment, a trailing `**` matches any suffix and
/// everything else is literal. Query strings and trailing slashes on the
/// endpoint are ignored. An empty scope allows everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct EndpointScope {
    patterns: Vec<String>,
    matchers: Vec<Regex>,
}

impl EndpointScope {
    pub fn new(patterns: Vec<String>) -> Self {
        let matchers = patterns.iter().filter_map(|p| compile_pattern(p)).collect();
        Self { patterns, matchers }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_unrestricted(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Check whether the scope admits `endpoint`
    pub fn allows(&self, endpoint: &str) -> bool {
        if self.is_unrestricted() {
            return true;
        }

        let endpoint = normalize_endpoint(endpoint);
        self.matchers.iter().any(|m| m.is_match(&endpoint))
    }
}

impl From<Vec<String>> for EndpointScope {
    fn from(patterns: Vec<String>) -> Self {
        Self::new(patterns)
    }
}

impl From<EndpointScope> for Vec<String> {
    fn from(scope: EndpointScope) -> Self {
        scope.patterns
    }
}

fn normalize_endpoint(endpoint: &str) -> String {
    let path = endpoint.split('?').next().unwrap_or_default();

    if path.len() > 1 {
        path.trim_end_matches('/').to_string()
    } else {
        path.to_string()
    }
}

fn compile_pattern(pattern: &str) -> Option<Regex> {
    let pattern = normalize_endpoint(pattern.trim());
    let mut expr = String::from("^");

    let (body, open_suffix) = match pattern.strip_suffix("/**") {
        Some(prefix) => (prefix, true),
        None => (pattern.as_str(), false),
    };

    for (i, segment) in body.split('/').enumerate() {
        if i > 0 {
            expr.push('/');
        }

        if segment == "*" {
            expr.push_str("[^/]+");
        } else {
            let parts: Vec<String> = segment.split('*').map(regex::escape).collect();
            expr.push_str(&parts.join("[^/]*"));
        }
    }

    if open_suffix {
        expr.push_str("(/.*)?");
    }

    expr.push('$');

    Regex::new(&expr).ok()
}
