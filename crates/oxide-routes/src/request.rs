//! Request-side types: methods, the current request and captured params.

use std::collections::HashMap;
use std::fmt;

use crate::error::{Result, RouterError};

/// HTTP request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET method
    Get,
    /// POST method
    Post,
    /// PUT method
    Put,
    /// PATCH method
    Patch,
    /// DELETE method
    Delete,
    /// HEAD method
    Head,
    /// OPTIONS method
    Options,
}

impl Method {
    /// Parses a method from a string, ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            "HEAD" => Some(Self::Head),
            "OPTIONS" => Some(Self::Options),
            _ => None,
        }
    }

    /// Returns the method as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of methods a route answers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodSet {
    /// Every method.
    Any,
    /// Only the listed methods.
    Only(Vec<Method>),
}

impl MethodSet {
    /// The set used by [`Router::map`](crate::Router::map) when none is given.
    pub fn standard() -> Self {
        Self::Only(vec![
            Method::Get,
            Method::Post,
            Method::Put,
            Method::Delete,
            Method::Patch,
        ])
    }

    /// Parses a `|`-separated list such as `GET|POST`.
    ///
    /// `ANY` (or `*`) yields [`MethodSet::Any`]; unknown names are skipped.
    pub fn parse(spec: &str) -> Self {
        let mut methods = Vec::new();
        for part in spec.split('|') {
            let part = part.trim();
            if part.eq_ignore_ascii_case("ANY") || part == "*" {
                return Self::Any;
            }
            if let Some(method) = Method::parse(part) {
                if !methods.contains(&method) {
                    methods.push(method);
                }
            }
        }
        Self::Only(methods)
    }

    /// Returns `true` if the set contains `method`.
    pub fn contains(&self, method: Method) -> bool {
        match self {
            Self::Any => true,
            Self::Only(methods) => methods.contains(&method),
        }
    }
}

impl From<Method> for MethodSet {
    fn from(method: Method) -> Self {
        Self::Only(vec![method])
    }
}

impl From<&str> for MethodSet {
    fn from(spec: &str) -> Self {
        Self::parse(spec)
    }
}

impl fmt::Display for MethodSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("ANY"),
            Self::Only(methods) => {
                let names: Vec<&str> = methods.iter().map(Method::as_str).collect();
                f.write_str(&names.join("|"))
            }
        }
    }
}

/// Named parameters captured from (or substituted into) a route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    params: HashMap<String, String>,
}

impl RouteParams {
    /// Creates new empty params.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds params from a JSON object; scalars are stringified and
    /// strings are taken verbatim. Anything other than an object is empty.
    pub fn from_json(value: &serde_json::Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::new();
        };
        object
            .iter()
            .filter_map(|(k, v)| {
                let v = match v {
                    serde_json::Value::String(s) => s.clone(),
                    serde_json::Value::Null => return None,
                    other => other.to_string(),
                };
                Some((k.clone(), v))
            })
            .collect()
    }

    /// Inserts a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    /// Gets a parameter value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Gets a parameter value or fails with [`RouterError::MissingParam`].
    pub fn require(&self, route: &str, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| RouterError::MissingParam {
            route: route.to_string(),
            param: key.to_string(),
        })
    }

    /// Parses a parameter as a specific type.
    pub fn parse<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    /// Returns the number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns `true` if no parameters were captured.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Returns an iterator over the parameters.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for RouteParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            params: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.to_string()))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: ToString, const N: usize> From<[(K, V); N]> for RouteParams {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl From<HashMap<String, String>> for RouteParams {
    fn from(params: HashMap<String, String>) -> Self {
        Self { params }
    }
}

impl From<&serde_json::Value> for RouteParams {
    fn from(value: &serde_json::Value) -> Self {
        Self::from_json(value)
    }
}

impl From<serde_json::Value> for RouteParams {
    fn from(value: serde_json::Value) -> Self {
        Self::from_json(&value)
    }
}

/// The request currently being routed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Request URI as received: absolute path plus optional query string.
    pub uri: String,
}

impl Request {
    /// Creates a new request.
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
        }
    }

    /// Creates a GET request.
    pub fn get(uri: impl Into<String>) -> Self {
        Self::new(Method::Get, uri)
    }

    /// Creates a POST request.
    pub fn post(uri: impl Into<String>) -> Self {
        Self::new(Method::Post, uri)
    }

    /// Returns the path without the query string.
    pub fn path(&self) -> &str {
        self.uri.split_once('?').map_or(&self.uri, |(path, _)| path)
    }

    /// Returns the raw query string, if any.
    pub fn query_string(&self) -> Option<&str> {
        self.uri.split_once('?').map(|(_, query)| query)
    }
}
