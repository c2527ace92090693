//! Named extension points fired by the host during a request.
//!
//! Each point keeps its listeners ordered by priority: lower numbers run
//! first, and listeners with equal priority run in registration order.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::query::{QueryState, QueryVars};

/// Priority used when none is given.
pub const DEFAULT_PRIORITY: i32 = 10;

/// Identifies an extension point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// The outgoing status line is being formatted.
    StatusHeader,
    /// Request variables have not been parsed yet.
    ParseRequest,
    /// The query has been parsed and classified.
    ParseQuery,
    /// Query defaults are about to be finalized before template selection.
    TemplateRedirect,
    /// A template has been selected.
    TemplateInclude,
}

impl HookPoint {
    /// Returns the conventional name of the point.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StatusHeader => "status_header",
            Self::ParseRequest => "do_parse_request",
            Self::ParseQuery => "parse_query",
            Self::TemplateRedirect => "template_redirect",
            Self::TemplateInclude => "template_include",
        }
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs to status line formatting.
#[derive(Debug, Clone, Copy)]
pub struct StatusLine<'a> {
    /// Protocol, e.g. `HTTP/1.1`.
    pub protocol: &'a str,
    /// Status code chosen by the host.
    pub code: u16,
    /// Reason phrase chosen by the host.
    pub text: &'a str,
}

/// Outcome of a request-variable listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseRequest {
    /// Let the host parse the request variables itself.
    Default,
    /// The variables were filled in; skip the host's parsing.
    Handled,
}

/// Rewrites the status line.
pub type StatusFilter = dyn Fn(String, &StatusLine<'_>) -> String + Send + Sync;
/// Inspects or replaces request variables.
pub type ParseRequestListener = dyn Fn(&mut QueryVars) -> ParseRequest + Send + Sync;
/// Adjusts the query classification.
pub type QueryAction = dyn Fn(&mut QueryState) + Send + Sync;
/// Claims the template selection.
pub type TemplateFilter = dyn Fn(&Path) -> Option<PathBuf> + Send + Sync;

/// Handle to a registered listener, used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Registered<L: ?Sized> {
    id: ListenerId,
    priority: i32,
    listener: Box<L>,
}

/// Listeners of one extension point, kept in priority order.
pub struct ExtensionPoint<L: ?Sized> {
    listeners: Vec<Registered<L>>,
}

impl<L: ?Sized> Default for ExtensionPoint<L> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }
}

impl<L: ?Sized> ExtensionPoint<L> {
    fn add(&mut self, id: ListenerId, priority: i32, listener: Box<L>) {
        let at = self
            .listeners
            .partition_point(|registered| registered.priority <= priority);
        self.listeners.insert(
            at,
            Registered {
                id,
                priority,
                listener,
            },
        );
    }

    fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|registered| registered.id != id);
        self.listeners.len() != before
    }

    /// Iterates listeners in firing order.
    pub fn iter(&self) -> impl Iterator<Item = &L> {
        self.listeners.iter().map(|registered| &*registered.listener)
    }

    /// Returns the number of listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Returns `true` if nothing listens on this point.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<L: ?Sized> fmt::Debug for ExtensionPoint<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let priorities: Vec<i32> = self.listeners.iter().map(|r| r.priority).collect();
        f.debug_struct("ExtensionPoint")
            .field("priorities", &priorities)
            .finish()
    }
}

/// All extension points of a request.
#[derive(Debug, Default)]
pub struct Hooks {
    status_header: ExtensionPoint<StatusFilter>,
    parse_request: ExtensionPoint<ParseRequestListener>,
    parse_query: ExtensionPoint<QueryAction>,
    template_redirect: ExtensionPoint<QueryAction>,
    template_include: ExtensionPoint<TemplateFilter>,
    next_id: u64,
}

impl Hooks {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Listens on [`HookPoint::StatusHeader`].
    pub fn on_status_header<F>(&mut self, priority: i32, f: F) -> ListenerId
    where
        F: Fn(String, &StatusLine<'_>) -> String + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.status_header.add(id, priority, Box::new(f));
        id
    }

    /// Listens on [`HookPoint::ParseRequest`].
    pub fn on_parse_request<F>(&mut self, priority: i32, f: F) -> ListenerId
    where
        F: Fn(&mut QueryVars) -> ParseRequest + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.parse_request.add(id, priority, Box::new(f));
        id
    }

    /// Listens on [`HookPoint::ParseQuery`].
    pub fn on_parse_query<F>(&mut self, priority: i32, f: F) -> ListenerId
    where
        F: Fn(&mut QueryState) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.parse_query.add(id, priority, Box::new(f));
        id
    }

    /// Listens on [`HookPoint::TemplateRedirect`].
    pub fn on_template_redirect<F>(&mut self, priority: i32, f: F) -> ListenerId
    where
        F: Fn(&mut QueryState) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.template_redirect.add(id, priority, Box::new(f));
        id
    }

    /// Listens on [`HookPoint::TemplateInclude`].
    pub fn on_template_include<F>(&mut self, priority: i32, f: F) -> ListenerId
    where
        F: Fn(&Path) -> Option<PathBuf> + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.template_include.add(id, priority, Box::new(f));
        id
    }

    fn next_id(&mut self) -> ListenerId {
        self.next_id += 1;
        ListenerId(self.next_id)
    }

    /// Detaches a listener from whichever point it was registered on.
    /// Returns `false` if it was already gone.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        self.status_header.remove(id)
            || self.parse_request.remove(id)
            || self.parse_query.remove(id)
            || self.template_redirect.remove(id)
            || self.template_include.remove(id)
    }

    /// Returns how many listeners are attached to `point`.
    pub fn count(&self, point: HookPoint) -> usize {
        match point {
            HookPoint::StatusHeader => self.status_header.len(),
            HookPoint::ParseRequest => self.parse_request.len(),
            HookPoint::ParseQuery => self.parse_query.len(),
            HookPoint::TemplateRedirect => self.template_redirect.len(),
            HookPoint::TemplateInclude => self.template_include.len(),
        }
    }

    /// Returns the total number of listeners.
    pub fn total(&self) -> usize {
        [
            HookPoint::StatusHeader,
            HookPoint::ParseRequest,
            HookPoint::ParseQuery,
            HookPoint::TemplateRedirect,
            HookPoint::TemplateInclude,
        ]
        .into_iter()
        .map(|point| self.count(point))
        .sum()
    }

    /// Fires [`HookPoint::StatusHeader`], threading the line through every filter.
    pub fn format_status(&self, protocol: &str, code: u16, text: &str) -> String {
        let status = StatusLine {
            protocol,
            code,
            text,
        };
        self.status_header
            .iter()
            .fold(format!("{protocol} {code} {text}"), |line, filter| {
                filter(line, &status)
            })
    }

    /// Fires [`HookPoint::ParseRequest`]. Returns `true` when a listener
    /// handled the variables; later listeners are then skipped.
    pub fn parse_request(&self, vars: &mut QueryVars) -> bool {
        self.parse_request
            .iter()
            .any(|listener| listener(vars) == ParseRequest::Handled)
    }

    /// Fires [`HookPoint::ParseQuery`].
    pub fn parse_query(&self, state: &mut QueryState) {
        for action in self.parse_query.iter() {
            action(state);
        }
    }

    /// Fires [`HookPoint::TemplateRedirect`].
    pub fn template_redirect(&self, state: &mut QueryState) {
        for action in self.template_redirect.iter() {
            action(state);
        }
    }

    /// Fires [`HookPoint::TemplateInclude`]. The first listener, in priority
    /// order, that claims the selection wins; otherwise `default` stands.
    pub fn select_template(&self, default: &Path) -> PathBuf {
        self.template_include
            .iter()
            .find_map(|filter| filter(default))
            .unwrap_or_else(|| default.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        let mut point: ExtensionPoint<dyn Fn() -> i32 + Send + Sync> = ExtensionPoint::default();
        point.add(ListenerId(1), 20, Box::new(|| 3));
        point.add(ListenerId(2), 5, Box::new(|| 1));
        point.add(ListenerId(3), 20, Box::new(|| 4));
        point.add(ListenerId(4), 10, Box::new(|| 2));

        let order: Vec<i32> = point.iter().map(|f| f()).collect();
        assert_eq!(order, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_remove_listener() {
        let mut hooks = Hooks::new();
        let early = hooks.on_template_include(1, |_| Some(PathBuf::from("early.php")));
        let status = hooks.on_status_header(DEFAULT_PRIORITY, |line, _| format!("{line}!"));
        hooks.on_template_include(5, |_| Some(PathBuf::from("late.php")));
        assert_ne!(early, status);

        assert!(hooks.remove(early));
        assert!(!hooks.remove(early));
        assert_eq!(hooks.select_template(Path::new("index")), PathBuf::from("late.php"));
        assert_eq!(hooks.count(HookPoint::StatusHeader), 1);

        assert!(hooks.remove(status));
        assert_eq!(hooks.format_status("HTTP/1.1", 200, "OK"), "HTTP/1.1 200 OK");
    }

    #[test]
    fn test_status_filters_chain() {
        let mut hooks = Hooks::new();
        assert_eq!(hooks.format_status("HTTP/1.1", 404, "Not Found"), "HTTP/1.1 404 Not Found");

        hooks.on_status_header(DEFAULT_PRIORITY, |line, status| {
            format!("{line} ({})", status.code)
        });
        assert_eq!(
            hooks.format_status("HTTP/1.1", 404, "Not Found"),
            "HTTP/1.1 404 Not Found (404)"
        );
    }

    #[test]
    fn test_parse_request_stops_when_handled() {
        let mut hooks = Hooks::new();
        hooks.on_parse_request(DEFAULT_PRIORITY, |vars| {
            vars.insert("p".to_string(), "1".to_string());
            ParseRequest::Handled
        });
        hooks.on_parse_request(DEFAULT_PRIORITY, |vars| {
            vars.insert("p".to_string(), "2".to_string());
            ParseRequest::Handled
        });

        let mut vars = QueryVars::new();
        assert!(hooks.parse_request(&mut vars));
        assert_eq!(vars.get("p").map(String::as_str), Some("1"));
        assert!(!Hooks::new().parse_request(&mut vars));
    }

    #[test]
    fn test_template_selection_lowest_priority_wins() {
        let mut hooks = Hooks::new();
        assert_eq!(hooks.select_template(Path::new("index")), PathBuf::from("index"));

        hooks.on_template_include(20, |_| Some(PathBuf::from("late.php")));
        hooks.on_template_include(5, |_| None);
        hooks.on_template_include(10, |_| Some(PathBuf::from("early.php")));
        assert_eq!(hooks.select_template(Path::new("index")), PathBuf::from("early.php"));
    }

    #[test]
    fn test_counts() {
        let mut hooks = Hooks::new();
        hooks.on_parse_query(1, QueryState::force_page);
        hooks.on_template_redirect(1, |state| state.is_not_found = false);
        assert_eq!(hooks.count(HookPoint::ParseQuery), 1);
        assert_eq!(hooks.count(HookPoint::TemplateRedirect), 1);
        assert_eq!(hooks.count(HookPoint::StatusHeader), 0);
        assert_eq!(hooks.total(), 2);
        assert_eq!(HookPoint::ParseRequest.to_string(), "do_parse_request");
    }
}
