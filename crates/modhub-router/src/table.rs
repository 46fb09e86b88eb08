//! Route tables and pattern matching.
//!
//! Patterns are tried in descending string order of the raw pattern text and
//! the first match wins. This is plain string precedence, not specificity:
//! `/a/b` beats `/a`, and `/a/b` also beats `/a/.*` because `b` sorts after `.`.

use std::collections::BTreeMap;

use regex::RegexBuilder;
use serde::Serialize;

use modhub_core::error::{AppError, ErrorKind};
use modhub_core::result::AppResult;

/// Mapping of path patterns to controller ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouteTable {
    routes: BTreeMap<String, String>,
}

impl RouteTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a route.
    pub fn insert(&mut self, pattern: impl Into<String>, controller: impl Into<String>) {
        self.routes.insert(pattern.into(), controller.into());
    }

    /// Builder form of [`RouteTable::insert`].
    pub fn with(mut self, pattern: impl Into<String>, controller: impl Into<String>) -> Self {
        self.insert(pattern, controller);
        self
    }

    /// Number of routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the table has no routes.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Routes in matching order: descending by pattern.
    pub fn iter_descending(&self) -> impl Iterator<Item = (&str, &str)> {
        self.routes
            .iter()
            .rev()
            .map(|(pattern, controller)| (pattern.as_str(), controller.as_str()))
    }

    /// First matching route for `path`, trying patterns in descending order.
    ///
    /// Each pattern is anchored at both ends, matched case-insensitively, and
    /// accepts an optional trailing slash. An invalid pattern is a
    /// configuration error.
    pub fn find(&self, path: &str) -> AppResult<Option<RouteMatch>> {
        for (pattern, controller) in self.iter_descending() {
            if let Some(found) = match_pattern(pattern, controller, path)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}

impl From<BTreeMap<String, String>> for RouteTable {
    fn from(routes: BTreeMap<String, String>) -> Self {
        Self { routes }
    }
}

impl<P: Into<String>, C: Into<String>> FromIterator<(P, C)> for RouteTable {
    fn from_iter<I: IntoIterator<Item = (P, C)>>(iter: I) -> Self {
        Self {
            routes: iter
                .into_iter()
                .map(|(p, c)| (p.into(), c.into()))
                .collect(),
        }
    }
}

/// A matched route and its captured path groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouteMatch {
    /// Pattern that matched.
    pub pattern: String,
    /// Controller id the pattern maps to.
    pub controller: String,
    /// Positional groups; index 0 is the whole match.
    pub groups: Vec<Option<String>>,
    /// Named groups.
    pub named: BTreeMap<String, String>,
}

impl RouteMatch {
    /// A match with no groups, used for the maintenance catch-all.
    pub fn catch_all(controller: impl Into<String>) -> Self {
        Self {
            controller: controller.into(),
            ..Self::default()
        }
    }

    /// Positional group `index`.
    pub fn group(&self, index: usize) -> Option<&str> {
        self.groups.get(index).and_then(|g| g.as_deref())
    }

    /// Named group `name`.
    pub fn name(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }
}

fn match_pattern(pattern: &str, controller: &str, path: &str) -> AppResult<Option<RouteMatch>> {
    let regex = RegexBuilder::new(&format!("^{pattern}/?$"))
        .case_insensitive(true)
        .build()
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Configuration,
                format!("Invalid route pattern '{pattern}'"),
                e,
            )
        })?;

    let Some(captures) = regex.captures(path) else {
        return Ok(None);
    };

    let groups = captures
        .iter()
        .map(|g| g.map(|m| m.as_str().to_string()))
        .collect();
    let named = regex
        .capture_names()
        .flatten()
        .filter_map(|name| {
            captures
                .name(name)
                .map(|m| (name.to_string(), m.as_str().to_string()))
        })
        .collect();

    Ok(Some(RouteMatch {
        pattern: pattern.to_string(),
        controller: controller.to_string(),
        groups,
        named,
    }))
}
