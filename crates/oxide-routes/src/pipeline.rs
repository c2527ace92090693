//! Per-request state shared between the router, handlers and the host.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

use crate::hooks::{Hooks, ListenerId};
use crate::request::Request;
use crate::template::TemplateLocator;

/// The response a handler settled on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentTemplate {
    /// Resolved template file.
    pub template: PathBuf,
    /// Status code sent with it (0 leaves the host's status alone).
    pub status: u16,
    /// Priority the template selection was registered with.
    pub priority: i32,
}

/// Extension points and template data of one request.
///
/// Dropped at the end of the request; nothing carries over.
#[derive(Debug, Default)]
pub struct ResponsePipeline {
    hooks: Hooks,
    template_data: Option<Value>,
    current: Option<CurrentTemplate>,
    /// Listeners installed for `current`.
    installed: Vec<ListenerId>,
}

impl ResponsePipeline {
    /// Creates an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the extension points.
    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    /// Returns the extension points for registration.
    pub fn hooks_mut(&mut self) -> &mut Hooks {
        &mut self.hooks
    }

    /// Data exposed to the rendered template.
    pub fn template_data(&self) -> Option<&Value> {
        self.template_data.as_ref()
    }

    /// Replaces the data exposed to the rendered template.
    pub fn set_template_data(&mut self, data: Value) {
        self.template_data = Some(data);
    }

    /// The winning response declared for this request.
    pub fn current_template(&self) -> Option<&CurrentTemplate> {
        self.current.as_ref()
    }

    /// Detaches the listeners of the current declaration, returning the
    /// hooks so the next declaration can register its own.
    pub(crate) fn retract_declaration(&mut self) -> &mut Hooks {
        for id in self.installed.drain(..) {
            self.hooks.remove(id);
        }
        &mut self.hooks
    }

    pub(crate) fn set_declaration(
        &mut self,
        current: CurrentTemplate,
        data: Option<Value>,
        installed: Vec<ListenerId>,
    ) {
        self.current = Some(current);
        self.template_data = data;
        self.installed = installed;
    }
}

/// Everything the router needs to serve the current request.
pub struct RequestContext {
    pub(crate) request: Request,
    pub(crate) pipeline: ResponsePipeline,
    pub(crate) locator: Arc<dyn TemplateLocator>,
}

impl RequestContext {
    /// Creates a context for `request`, resolving templates with `locator`.
    pub fn new(request: Request, locator: Arc<dyn TemplateLocator>) -> Self {
        Self {
            request,
            pipeline: ResponsePipeline::new(),
            locator,
        }
    }

    /// The request being served.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// The request's response pipeline.
    pub fn pipeline(&self) -> &ResponsePipeline {
        &self.pipeline
    }

    /// The request's response pipeline, mutably.
    pub fn pipeline_mut(&mut self) -> &mut ResponsePipeline {
        &mut self.pipeline
    }

    /// The template locator.
    pub fn locator(&self) -> &dyn TemplateLocator {
        self.locator.as_ref()
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("request", &self.request)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}
