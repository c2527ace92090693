//! Route table: block-syntax patterns, matching and reverse generation.
//!
//! Routes are stored relative to a base path and written in block syntax:
//!
//! - `posts/[:slug]` - one segment (no `/` or `.`) captured as `slug`
//! - `posts/[i:id]` - digits only
//! - `files/[**:path]` - the rest of the path
//! - `archive/[i:year]/[i:month]?` - trailing optional block
//! - `*` - every path
//! - `@^feed/(?P<kind>rss|atom)$` - raw regex
//!
//! Block types: `i` digits, `a` alphanumerics, `h` hex digits, `*` lazy
//! anything, `**` greedy anything, empty for a single segment. Any other
//! type string is used as a regex.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Result, RouterError};
use crate::request::{Method, MethodSet, RouteParams};

static BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(/|\.|)\[([^:\]]*)(?::([^:\]]*))?\](\?|)").expect("block regex is valid")
});

/// A `[type:name]` block inside a route.
#[derive(Debug, Clone)]
pub struct Block {
    /// Separator consumed together with the block (`/`, `.` or empty).
    pub prefix: String,
    /// Match type (`i`, `a`, `h`, `*`, `**`, empty, or a raw regex).
    pub kind: String,
    /// Parameter name, if the block captures one.
    pub name: Option<String>,
    /// Whether the block may be absent.
    pub optional: bool,
}

impl Block {
    fn regex(&self) -> &str {
        match self.kind.as_str() {
            "i" => "[0-9]+",
            "a" => "[0-9A-Za-z]+",
            "h" => "[0-9A-Fa-f]+",
            "*" => ".+?",
            "**" => ".+",
            "" => r"[^/\.]+",
            custom => custom,
        }
    }
}

/// A piece of a route pattern.
#[derive(Debug, Clone)]
pub enum Segment {
    /// Literal text.
    Literal(String),
    /// A parameter block.
    Block(Block),
}

#[derive(Debug, Clone)]
enum Matcher {
    All,
    Regex(Regex),
}

/// A compiled route pattern.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    source: String,
    segments: Vec<Segment>,
    matcher: Matcher,
    /// `(capture group, param name)` pairs.
    captures: Vec<(String, String)>,
}

impl RoutePattern {
    /// Parses a route written in block syntax.
    pub fn parse(source: &str) -> Result<Self> {
        let invalid = |source_err| RouterError::InvalidPattern {
            pattern: source.to_string(),
            source: source_err,
        };

        if source == "*" {
            return Ok(Self {
                source: source.to_string(),
                segments: vec![Segment::Literal(source.to_string())],
                matcher: Matcher::All,
                captures: Vec::new(),
            });
        }

        if let Some(raw) = source.strip_prefix('@') {
            let regex = Regex::new(raw).map_err(invalid)?;
            let captures = regex
                .capture_names()
                .flatten()
                .map(|n| (n.to_string(), n.to_string()))
                .collect();
            return Ok(Self {
                source: source.to_string(),
                segments: vec![Segment::Literal(source.to_string())],
                matcher: Matcher::Regex(regex),
                captures,
            });
        }

        let mut segments = Vec::new();
        let mut captures = Vec::new();
        let mut regex_str = String::from("^");
        let mut last = 0;

        for caps in BLOCK.captures_iter(source) {
            let Some(whole) = caps.get(0) else { continue };
            if whole.start() > last {
                let literal = &source[last..whole.start()];
                regex_str.push_str(&regex::escape(literal));
                segments.push(Segment::Literal(literal.to_string()));
            }
            last = whole.end();

            let block = Block {
                prefix: caps.get(1).map_or("", |m| m.as_str()).to_string(),
                kind: caps.get(2).map_or("", |m| m.as_str()).to_string(),
                name: caps
                    .get(3)
                    .map(|m| m.as_str())
                    .filter(|n| !n.is_empty())
                    .map(str::to_string),
                optional: caps.get(4).is_some_and(|m| !m.is_empty()),
            };

            regex_str.push_str("(?:");
            regex_str.push_str(&regex::escape(&block.prefix));
            let group = format!("b{}", segments.len());
            regex_str.push_str(&format!("(?P<{group}>{}))", block.regex()));
            if block.optional {
                regex_str.push('?');
            }
            if let Some(name) = &block.name {
                captures.push((group, name.clone()));
            }
            segments.push(Segment::Block(block));
        }

        if last < source.len() {
            let literal = &source[last..];
            regex_str.push_str(&regex::escape(literal));
            segments.push(Segment::Literal(literal.to_string()));
        }
        regex_str.push('$');

        let regex = Regex::new(&regex_str).map_err(invalid)?;
        Ok(Self {
            source: source.to_string(),
            segments,
            matcher: Matcher::Regex(regex),
            captures,
        })
    }

    /// Returns the pattern as written.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the parsed segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns the names of all captured parameters, in order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.captures.iter().map(|(_, name)| name.as_str())
    }

    /// Matches a base-path-relative path, returning the captured params.
    pub fn match_path(&self, path: &str) -> Option<RouteParams> {
        let regex = match &self.matcher {
            Matcher::All => return Some(RouteParams::new()),
            Matcher::Regex(regex) => regex,
        };
        let caps = regex.captures(path)?;

        let mut params = RouteParams::new();
        for (group, name) in &self.captures {
            if let Some(value) = caps.name(group) {
                params.insert(name.clone(), value.as_str());
            }
        }
        Some(params)
    }

    /// Substitutes params into the pattern.
    ///
    /// A missing optional block is dropped together with its prefix (except
    /// the first block, which keeps its prefix). A missing required block
    /// is an error.
    pub fn reverse(&self, params: &RouteParams) -> Result<String> {
        let mut url = String::new();
        let mut first_block = true;

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => url.push_str(text),
                Segment::Block(block) => {
                    let value = block.name.as_deref().and_then(|n| params.get(n));
                    match value {
                        Some(value) => {
                            url.push_str(&block.prefix);
                            url.push_str(value);
                        }
                        None if block.optional => {
                            if first_block {
                                url.push_str(&block.prefix);
                            }
                        }
                        None => {
                            return Err(RouterError::MissingParam {
                                route: self.source.clone(),
                                param: block.name.clone().unwrap_or_else(|| block.kind.clone()),
                            });
                        }
                    }
                    first_block = false;
                }
            }
        }

        Ok(url)
    }
}

/// A registered route.
#[derive(Debug, Clone)]
pub struct RouteEntry<T> {
    /// Methods this route answers to.
    pub methods: MethodSet,
    /// Compiled pattern.
    pub pattern: RoutePattern,
    /// What the route dispatches to.
    pub target: T,
    /// Optional unique name for reverse generation.
    pub name: Option<String>,
}

/// A successful match.
#[derive(Debug)]
pub struct RouteMatch<'a, T> {
    /// The matched target.
    pub target: &'a T,
    /// Captured named params.
    pub params: RouteParams,
    /// Name of the matched route, if any.
    pub name: Option<&'a str>,
    /// Pattern of the matched route.
    pub pattern: &'a str,
}

/// Ordered collection of routes with named lookup.
#[derive(Debug, Clone)]
pub struct RouteTable<T> {
    routes: Vec<RouteEntry<T>>,
    named: HashMap<String, usize>,
    base_path: String,
}

impl<T> Default for RouteTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RouteTable<T> {
    /// Creates an empty table rooted at `/`.
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            named: HashMap::new(),
            base_path: "/".to_string(),
        }
    }

    /// Sets the base path stripped from requests and prefixed to URLs.
    pub fn set_base_path(&mut self, base_path: impl Into<String>) {
        self.base_path = base_path.into();
    }

    /// Returns the base path.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Registers a route.
    pub fn map(
        &mut self,
        methods: MethodSet,
        route: &str,
        target: T,
        name: Option<&str>,
    ) -> Result<()> {
        let pattern = RoutePattern::parse(route)?;

        if let Some(name) = name {
            if self.named.contains_key(name) {
                return Err(RouterError::DuplicateRouteName(name.to_string()));
            }
            self.named.insert(name.to_string(), self.routes.len());
        }

        self.routes.push(RouteEntry {
            methods,
            pattern,
            target,
            name: name.map(str::to_string),
        });
        Ok(())
    }

    /// Returns the registered routes in match order.
    pub fn routes(&self) -> &[RouteEntry<T>] {
        &self.routes
    }

    /// Returns the number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Looks up a route by name.
    pub fn named(&self, name: &str) -> Option<&RouteEntry<T>> {
        self.named.get(name).map(|&i| &self.routes[i])
    }

    /// Strips the base path and query string from a request URI.
    pub fn relative_path<'a>(&self, uri: &'a str) -> &'a str {
        let path = uri.split_once('?').map_or(uri, |(path, _)| path);
        if let Some(rest) = path.strip_prefix(self.base_path.as_str()) {
            return rest;
        }
        if path.len() + 1 == self.base_path.len() && self.base_path.starts_with(path) {
            return "";
        }
        path
    }

    /// Finds the first route that accepts `method` and matches `uri`.
    pub fn match_request(&self, method: Method, uri: &str) -> Option<RouteMatch<'_, T>> {
        let path = self.relative_path(uri);

        self.routes
            .iter()
            .filter(|route| route.methods.contains(method))
            .find_map(|route| {
                route.pattern.match_path(path).map(|params| RouteMatch {
                    target: &route.target,
                    params,
                    name: route.name.as_deref(),
                    pattern: route.pattern.source(),
                })
            })
    }

    /// Generates the URL of a named route.
    ///
    /// When `method` is given, the route must accept it.
    pub fn generate(
        &self,
        name: &str,
        params: &RouteParams,
        method: Option<Method>,
    ) -> Result<String> {
        let route = self
            .named(name)
            .ok_or_else(|| RouterError::RouteNotFound(name.to_string()))?;

        if let Some(method) = method {
            if !route.methods.contains(method) {
                return Err(RouterError::MethodNotAllowed {
                    method: method.to_string(),
                    route: name.to_string(),
                });
            }
        }

        Ok(format!("{}{}", self.base_path, route.pattern.reverse(params)?))
    }

    /// Generates a URL from an inline block-syntax pattern.
    pub fn generate_pattern(&self, route: &str, params: &RouteParams) -> Result<String> {
        let pattern = RoutePattern::parse(route)?;
        Ok(format!("{}{}", self.base_path, pattern.reverse(params)?))
    }
}
