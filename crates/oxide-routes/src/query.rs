//! Query variables, query classification and query overrides.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

/// Request variables the host resolves content from.
pub type QueryVars = HashMap<String, String>;

/// Parses an encoded query string (`a=1&b=two`) into variables.
pub fn parse_query_string(query: &str) -> QueryVars {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

/// How the host has classified the current query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryState {
    /// Whether this is the request's main query.
    pub is_main_query: bool,
    /// Nothing was found for the request.
    pub is_not_found: bool,
    /// The request targets an attachment.
    pub is_attachment: bool,
    /// The request resolves to a generic page.
    pub is_page: bool,
}

impl QueryState {
    /// Classification of the main query before any hook runs.
    pub fn main(not_found: bool) -> Self {
        Self {
            is_main_query: true,
            is_not_found: not_found,
            is_attachment: false,
            is_page: false,
        }
    }

    /// Forces the query to a resolvable page when it is the main query.
    pub fn force_page(&mut self) {
        if self.is_main_query {
            self.is_not_found = false;
            self.is_attachment = false;
            self.is_page = true;
        }
    }
}

/// A source for the request variables, replacing the host's own parsing.
#[derive(Clone)]
pub enum QueryOverride {
    /// Use these variables as-is.
    Vars(QueryVars),
    /// Parse this query string; an empty string declines the override.
    Encoded(String),
    /// Compute the override when the host asks for it.
    Deferred(Arc<dyn Fn() -> QueryOverride + Send + Sync>),
}

impl QueryOverride {
    /// Wraps a closure evaluated when the request variables are resolved.
    pub fn deferred<F>(f: F) -> Self
    where
        F: Fn() -> QueryOverride + Send + Sync + 'static,
    {
        Self::Deferred(Arc::new(f))
    }

    /// Resolves to concrete variables, or `None` to let the host fall back
    /// to its default parsing.
    pub fn resolve(&self) -> Option<QueryVars> {
        let evaluated;
        let value = match self {
            Self::Deferred(f) => {
                evaluated = f();
                &evaluated
            }
            other => other,
        };

        match value {
            Self::Vars(vars) => Some(vars.clone()),
            Self::Encoded(query) if !query.is_empty() => Some(parse_query_string(query)),
            Self::Encoded(_) => None,
            Self::Deferred(_) => {
                warn!("Query override produced another closure, declining");
                None
            }
        }
    }
}

impl fmt::Debug for QueryOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vars(vars) => f.debug_tuple("Vars").field(vars).finish(),
            Self::Encoded(query) => f.debug_tuple("Encoded").field(query).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<QueryVars> for QueryOverride {
    fn from(vars: QueryVars) -> Self {
        Self::Vars(vars)
    }
}

impl From<&str> for QueryOverride {
    fn from(query: &str) -> Self {
        Self::Encoded(query.to_string())
    }
}

impl From<String> for QueryOverride {
    fn from(query: String) -> Self {
        Self::Encoded(query)
    }
}
