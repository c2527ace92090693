//! A minimal host request lifecycle.
//!
//! Real hosts fire the extension points from their own request handling.
//! [`RequestLifecycle`] fires them in the same order so applications can be
//! exercised end to end:
//!
//! 1. [`Signal::Init`] and [`Signal::Loaded`] (the router matches once)
//! 2. request variables ([`HookPoint::ParseRequest`](crate::HookPoint::ParseRequest)),
//!    falling back to the query string
//! 3. classification ([`HookPoint::ParseQuery`](crate::HookPoint::ParseQuery))
//! 4. query defaults ([`HookPoint::TemplateRedirect`](crate::HookPoint::TemplateRedirect))
//! 5. template selection ([`HookPoint::TemplateInclude`](crate::HookPoint::TemplateInclude))
//! 6. status line ([`HookPoint::StatusHeader`](crate::HookPoint::StatusHeader))

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

use crate::error::Result;
use crate::pipeline::RequestContext;
use crate::query::{QueryState, QueryVars, parse_query_string};
use crate::response::{Flow, Redirect, status_text};
use crate::router::{Dispatch, Router, Signal};

/// Template selected when the query found nothing.
pub const NOT_FOUND_TEMPLATE: &str = "404";
/// Template selected otherwise.
pub const INDEX_TEMPLATE: &str = "index";

/// What the host ends up sending.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A handler redirected; nothing else ran.
    Redirect(Redirect),
    /// Render a template.
    Render(Rendering),
}

/// A template ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendering {
    /// Formatted status line, e.g. `HTTP/1.1 200 OK`.
    pub status_line: String,
    /// Selected template.
    pub template: PathBuf,
    /// Data exposed to the template.
    pub template_data: Option<Value>,
    /// Resolved request variables.
    pub query_vars: QueryVars,
    /// Final query classification.
    pub query: QueryState,
}

impl Rendering {
    /// The status code carried by the status line.
    pub fn status_code(&self) -> Option<u16> {
        self.status_line.split_whitespace().nth(1)?.parse().ok()
    }
}

/// Fires the host extension points for one request.
#[derive(Debug, Clone)]
pub struct RequestLifecycle {
    protocol: String,
}

impl Default for RequestLifecycle {
    fn default() -> Self {
        Self::new("HTTP/1.1")
    }
}

impl RequestLifecycle {
    /// Creates a lifecycle answering with `protocol`.
    pub fn new(protocol: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
        }
    }

    /// Runs the request through the router and the extension points.
    pub fn run(&self, router: &mut Router, cx: &mut RequestContext) -> Result<Resolution> {
        for signal in [Signal::Init, Signal::Loaded] {
            if let Dispatch::Handled(Flow::Halt(redirect)) = router.on_signal(signal, cx)? {
                info!(location = %redirect.location, "Request halted by redirect");
                return Ok(Resolution::Redirect(redirect));
            }
        }

        let hooks = cx.pipeline.hooks();

        let mut query_vars = QueryVars::new();
        if !hooks.parse_request(&mut query_vars) {
            query_vars = cx
                .request
                .query_string()
                .map(parse_query_string)
                .unwrap_or_default();
        }

        // Pretty URLs the host knows nothing about resolve to no content.
        let unknown_path = !router
            .relative_path(&cx.request.uri)
            .trim_matches('/')
            .is_empty();
        let mut query = QueryState::main(unknown_path && query_vars.is_empty());

        hooks.parse_query(&mut query);
        hooks.template_redirect(&mut query);

        let (code, default_template) = if query.is_not_found {
            (404, NOT_FOUND_TEMPLATE)
        } else {
            (200, INDEX_TEMPLATE)
        };
        let template = hooks.select_template(Path::new(default_template));
        let status_line = hooks.format_status(&self.protocol, code, status_text(code));

        debug!(
            status_line = %status_line,
            template = %template.display(),
            "Request resolved"
        );

        Ok(Resolution::Render(Rendering {
            status_line,
            template,
            template_data: cx.pipeline.template_data().cloned(),
            query_vars,
            query,
        }))
    }
}
