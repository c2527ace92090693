//! Deferred response declarations.
//!
//! A handler declares what the request should render; the declaration is
//! realized later, when the host fires the matching extension points.
//!
//! ```ignore
//! router.get("events/:slug", |cx| {
//!     let slug = cx.param("slug").unwrap_or_default().to_string();
//!     cx.declare(
//!         ResponseDeclaration::new("single-event.php")
//!             .params(json!({ "slug": slug }))
//!             .query(format!("post_type=event&name={slug}")),
//!     );
//!     Ok(Flow::Continue)
//! }, Some("event"))?;
//! ```

use serde_json::Value;
use tracing::{debug, warn};

use crate::hooks::{DEFAULT_PRIORITY, ParseRequest};
use crate::pipeline::{CurrentTemplate, ResponsePipeline};
use crate::query::{QueryOverride, QueryState};
use crate::response::status_text;
use crate::template::TemplateLocator;

/// Status code that keeps the host's not-found classification.
const NOT_FOUND: u16 = 404;

/// Priority of the query classification corrections; they must run before
/// the host's own listeners at the default priority.
const CLASSIFICATION_PRIORITY: i32 = 1;

/// What a handler wants the request to render.
#[derive(Debug, Clone)]
pub struct ResponseDeclaration {
    /// Template path or conventional template name.
    pub template: String,
    /// Data exposed to the template.
    pub params: Option<Value>,
    /// Replacement for the host's request variables.
    pub query: Option<QueryOverride>,
    /// Status code to send; 0 leaves the host's status alone.
    pub status: u16,
    /// Priority of the template selection.
    pub priority: i32,
}

impl ResponseDeclaration {
    /// Declares `template` with status 200 at the default priority.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            params: None,
            query: None,
            status: 200,
            priority: DEFAULT_PRIORITY,
        }
    }

    /// Sets the template data.
    #[must_use]
    pub fn params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    /// Sets the query override.
    #[must_use]
    pub fn query(mut self, query: impl Into<QueryOverride>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Sets the status code.
    #[must_use]
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Sets the template selection priority.
    #[must_use]
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// Installs response declarations into a request's pipeline.
pub struct ResponseDispatcher<'a> {
    pipeline: &'a mut ResponsePipeline,
    locator: &'a dyn TemplateLocator,
}

impl<'a> ResponseDispatcher<'a> {
    /// Creates a dispatcher for one request.
    pub fn new(pipeline: &'a mut ResponsePipeline, locator: &'a dyn TemplateLocator) -> Self {
        Self { pipeline, locator }
    }

    /// Declares `template` with default settings.
    pub fn load(&mut self, template: &str) -> bool {
        self.declare(ResponseDeclaration::new(template))
    }

    /// Arranges for the pipeline to render `declaration`.
    ///
    /// A request renders one declaration: the one with the lowest priority
    /// number, the latest one among equals. A winning declaration replaces
    /// the listeners and template data of the previous one. A losing one
    /// installs nothing.
    ///
    /// Returns `false`, leaving the pipeline untouched, when the template
    /// cannot be resolved.
    pub fn declare(&mut self, declaration: ResponseDeclaration) -> bool {
        let ResponseDeclaration {
            template: reference,
            params,
            query,
            status,
            priority,
        } = declaration;

        let Some(template) = self.locator.resolve(&reference) else {
            warn!(template = %reference, "Template could not be resolved");
            return false;
        };

        if let Some(winning) = self.pipeline.current_template() {
            if winning.priority < priority {
                debug!(
                    template = %template.display(),
                    priority,
                    winning = winning.priority,
                    "Response declaration superseded"
                );
                return true;
            }
        }

        let hooks = self.pipeline.retract_declaration();
        let mut installed = Vec::new();

        if status != 0 {
            installed.push(hooks.on_status_header(DEFAULT_PRIORITY, move |_, line| {
                format!("{} {} {}", line.protocol, status, status_text(status))
            }));

            if status != NOT_FOUND {
                installed.push(
                    hooks.on_parse_query(CLASSIFICATION_PRIORITY, QueryState::force_page),
                );
                installed.push(
                    hooks.on_template_redirect(CLASSIFICATION_PRIORITY, |state| {
                        state.is_not_found = false;
                    }),
                );
            }
        }

        if let Some(query) = query {
            installed.push(hooks.on_parse_request(DEFAULT_PRIORITY, move |vars| {
                match query.resolve() {
                    Some(resolved) => {
                        *vars = resolved;
                        ParseRequest::Handled
                    }
                    None => {
                        warn!("Query override is empty, using default request parsing");
                        ParseRequest::Default
                    }
                }
            }));
        }

        let selected = template.clone();
        installed.push(hooks.on_template_include(priority, move |_| Some(selected.clone())));

        debug!(
            template = %template.display(),
            status,
            priority,
            "Response declared"
        );
        self.pipeline.set_declaration(
            CurrentTemplate {
                template,
                status,
                priority,
            },
            params,
            installed,
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use serde_json::json;

    use super::*;
    use crate::hooks::HookPoint;
    use crate::query::QueryVars;

    struct Fixed(&'static [&'static str]);

    impl TemplateLocator for Fixed {
        fn is_readable(&self, _reference: &str) -> bool {
            false
        }

        fn locate(&self, name: &str) -> Option<PathBuf> {
            self.0
                .iter()
                .any(|known| *known == name)
                .then(|| Path::new("/theme").join(name))
        }
    }

    static THEME: Fixed = Fixed(&["single.php", "page.php", "404.php"]);

    #[test]
    fn test_declare_resolved_template() {
        let mut pipeline = ResponsePipeline::new();
        let mut dispatcher = ResponseDispatcher::new(&mut pipeline, &THEME);
        let declaration = ResponseDeclaration::new("single.php").params(json!({"id": 5}));
        assert!(dispatcher.declare(declaration));

        assert_eq!(
            pipeline.hooks().select_template(Path::new("index")),
            PathBuf::from("/theme/single.php")
        );
        assert_eq!(pipeline.template_data(), Some(&json!({"id": 5})));
        assert_eq!(pipeline.current_template().unwrap().status, 200);
    }

    #[test]
    fn test_unresolved_template_installs_nothing() {
        let mut pipeline = ResponsePipeline::new();
        let mut dispatcher = ResponseDispatcher::new(&mut pipeline, &THEME);
        assert!(!dispatcher.declare(
            ResponseDeclaration::new("missing.php")
                .params(json!({"id": 5}))
                .query("p=5")
        ));

        assert_eq!(pipeline.hooks().total(), 0);
        assert_eq!(pipeline.template_data(), None);
        assert_eq!(pipeline.current_template(), None);
    }

    #[test]
    fn test_success_status_suppresses_not_found() {
        let mut pipeline = ResponsePipeline::new();
        ResponseDispatcher::new(&mut pipeline, &THEME).load("page.php");

        let hooks = pipeline.hooks();
        assert_eq!(hooks.count(HookPoint::ParseQuery), 1);
        assert_eq!(hooks.count(HookPoint::TemplateRedirect), 1);

        let mut state = QueryState::main(true);
        hooks.parse_query(&mut state);
        assert!(state.is_page);
        assert!(!state.is_not_found);
    }

    #[test]
    fn test_not_found_status_keeps_classification() {
        let mut pipeline = ResponsePipeline::new();
        ResponseDispatcher::new(&mut pipeline, &THEME)
            .declare(ResponseDeclaration::new("404.php").status(404));

        let hooks = pipeline.hooks();
        assert_eq!(hooks.count(HookPoint::StatusHeader), 1);
        assert_eq!(hooks.count(HookPoint::ParseQuery), 0);
        assert_eq!(hooks.count(HookPoint::TemplateRedirect), 0);
        assert_eq!(
            hooks.format_status("HTTP/1.1", 200, "OK"),
            "HTTP/1.1 404 Not Found"
        );
    }

    #[test]
    fn test_zero_status_leaves_status_alone() {
        let mut pipeline = ResponsePipeline::new();
        ResponseDispatcher::new(&mut pipeline, &THEME)
            .declare(ResponseDeclaration::new("page.php").status(0));

        let hooks = pipeline.hooks();
        assert_eq!(hooks.count(HookPoint::StatusHeader), 0);
        assert_eq!(hooks.count(HookPoint::ParseQuery), 0);
        assert_eq!(hooks.count(HookPoint::TemplateInclude), 1);
    }

    #[test]
    fn test_query_override() {
        let mut pipeline = ResponsePipeline::new();
        ResponseDispatcher::new(&mut pipeline, &THEME)
            .declare(ResponseDeclaration::new("page.php").query("pagename=about"));

        let mut vars = QueryVars::new();
        assert!(pipeline.hooks().parse_request(&mut vars));
        assert_eq!(vars.get("pagename").map(String::as_str), Some("about"));
    }

    #[test]
    fn test_empty_query_override_declines() {
        let mut pipeline = ResponsePipeline::new();
        ResponseDispatcher::new(&mut pipeline, &THEME)
            .declare(ResponseDeclaration::new("page.php").query(""));

        let mut vars = QueryVars::new();
        assert!(!pipeline.hooks().parse_request(&mut vars));
        assert!(vars.is_empty());
    }

    #[test]
    fn test_winning_declaration_retracts_previous() {
        let mut pipeline = ResponsePipeline::new();
        let mut dispatcher = ResponseDispatcher::new(&mut pipeline, &THEME);
        dispatcher.declare(ResponseDeclaration::new("page.php").params(json!({"who": "page"})));
        dispatcher.declare(ResponseDeclaration::new("404.php").status(404));

        let hooks = pipeline.hooks();
        assert_eq!(hooks.total(), 2);
        assert_eq!(hooks.count(HookPoint::ParseQuery), 0);
        assert_eq!(
            hooks.select_template(Path::new("index")),
            PathBuf::from("/theme/404.php")
        );
        assert_eq!(pipeline.template_data(), None);
        assert_eq!(pipeline.current_template().unwrap().status, 404);
    }

    #[test]
    fn test_lower_priority_declaration_wins() {
        let mut pipeline = ResponsePipeline::new();
        let mut dispatcher = ResponseDispatcher::new(&mut pipeline, &THEME);
        dispatcher.declare(ResponseDeclaration::new("page.php").priority(20));
        dispatcher.declare(ResponseDeclaration::new("single.php").priority(5));

        assert_eq!(
            pipeline.hooks().select_template(Path::new("index")),
            PathBuf::from("/theme/single.php")
        );
    }
}
