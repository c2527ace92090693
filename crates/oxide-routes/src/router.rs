//! Main router implementation.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dispatcher::{ResponseDeclaration, ResponseDispatcher};
use crate::error::{Result, RouterError};
use crate::pattern::{compile_relative, is_compiled, trailing_slash, untrailing_slash};
use crate::pipeline::{RequestContext, ResponsePipeline};
use crate::request::{Method, MethodSet, Request, RouteParams};
use crate::response::{Flow, Redirect};
use crate::site::SiteConfig;
use crate::table::RouteTable;
use crate::template::TemplateLocator;

/// A route handler.
///
/// Every handler has the same shape whether it is a plain function, a
/// closure, or a method bound through a closure.
pub type Handler = Arc<dyn Fn(&mut RouteContext<'_>) -> Result<Flow> + Send + Sync>;

/// Lifecycle signals from the host that trigger routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// The host finished initializing.
    Init,
    /// The host is ready to dispatch the request.
    Loaded,
}

/// Result of [`Router::match_current_request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Routing already happened; nothing was done.
    AlreadyMatched,
    /// No route matched; the host's default handling applies.
    NoMatch,
    /// A handler ran and returned this flow.
    Handled(Flow),
}

/// The route that matched the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentRoute {
    /// Route name, if the matched entry carries one.
    pub name: Option<String>,
    /// Compiled pattern that matched.
    pub pattern: String,
    /// Request method.
    pub method: Method,
    /// Captured params.
    pub params: RouteParams,
}

/// URL generation over a route table and site configuration.
#[derive(Clone, Copy)]
pub struct Urls<'a> {
    table: &'a RouteTable<Handler>,
    site: &'a SiteConfig,
}

impl Urls<'_> {
    /// Generates the base-path-rooted URL of a named route or inline pattern.
    ///
    /// Names are looked up first. A string that is not a registered name
    /// but contains `/`, `:` or `[` is compiled as an inline pattern in
    /// its canonical trailing-slash form.
    pub fn generate(
        &self,
        route: &str,
        params: impl Into<RouteParams>,
        method: Option<Method>,
    ) -> Result<String> {
        let params = params.into();

        if self.table.named(route).is_some() {
            return self.table.generate(route, &params, method);
        }

        let compiled = compile_relative(route);
        if self.table.named(&compiled).is_some() {
            return self.table.generate(&compiled, &params, method);
        }

        if is_compiled(&compiled) || route.contains('/') {
            return self
                .table
                .generate_pattern(&trailing_slash(&compiled), &params);
        }

        Err(RouterError::RouteNotFound(route.to_string()))
    }

    /// Generates an absolute URL using the site's base URL.
    pub fn generate_absolute(
        &self,
        route: &str,
        params: impl Into<RouteParams>,
        method: Option<Method>,
    ) -> Result<String> {
        let url = self.generate(route, params, method)?;
        self.site.absolute(&url)
    }

    /// Builds a redirect to a route.
    ///
    /// The target's method set is not checked, so a redirect may point at a
    /// route that only accepts other methods.
    pub fn redirect(&self, route: &str, params: impl Into<RouteParams>) -> Result<Flow> {
        let location = self.generate(route, params, None)?;
        info!(route, location = %location, "Redirecting");
        Ok(Flow::Halt(Redirect::to(location)))
    }
}

/// What a handler sees while it runs.
pub struct RouteContext<'a> {
    params: Option<RouteParams>,
    request: &'a Request,
    pipeline: &'a mut ResponsePipeline,
    locator: &'a dyn TemplateLocator,
    urls: Urls<'a>,
}

impl<'a> RouteContext<'a> {
    /// Captured params, or `None` when the route captured nothing.
    pub fn params(&self) -> Option<&RouteParams> {
        self.params.as_ref()
    }

    /// A single captured param.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.as_ref().and_then(|p| p.get(name))
    }

    /// The request being served.
    pub fn request(&self) -> &Request {
        self.request
    }

    /// The request's response pipeline.
    pub fn pipeline(&mut self) -> &mut ResponsePipeline {
        &mut *self.pipeline
    }

    /// A dispatcher bound to this request.
    pub fn dispatcher(&mut self) -> ResponseDispatcher<'_> {
        ResponseDispatcher::new(&mut *self.pipeline, self.locator)
    }

    /// Declares the response; see [`ResponseDispatcher::declare`].
    pub fn declare(&mut self, declaration: ResponseDeclaration) -> bool {
        self.dispatcher().declare(declaration)
    }

    /// Declares `template` with default settings.
    pub fn load(&mut self, template: &str) -> bool {
        self.dispatcher().load(template)
    }

    /// URL generation for this router.
    pub fn urls(&self) -> Urls<'a> {
        self.urls
    }

    /// See [`Urls::generate`].
    pub fn generate(
        &self,
        route: &str,
        params: impl Into<RouteParams>,
        method: Option<Method>,
    ) -> Result<String> {
        self.urls.generate(route, params, method)
    }

    /// See [`Urls::redirect`]. Return the flow from the handler to stop
    /// processing the request.
    pub fn redirect(&self, route: &str, params: impl Into<RouteParams>) -> Result<Flow> {
        self.urls.redirect(route, params)
    }
}

/// Maps URL patterns to handlers and routes the current request once.
pub struct Router {
    table: RouteTable<Handler>,
    site: SiteConfig,
    has_matched: bool,
    current: Option<CurrentRoute>,
}

impl Router {
    /// Creates a router rooted at the site's base path.
    pub fn new(site: SiteConfig) -> Result<Self> {
        let mut table = RouteTable::new();
        table.set_base_path(site.base_path()?);
        Ok(Self {
            table,
            site,
            has_matched: false,
            current: None,
        })
    }

    /// Maps `pattern` to `handler` for `methods`.
    ///
    /// Registers the canonical trailing-slash form, which carries `name`,
    /// and an anonymous form without the trailing slash.
    pub fn map<F>(
        &mut self,
        pattern: &str,
        handler: F,
        methods: impl Into<MethodSet>,
        name: Option<&str>,
    ) -> Result<&mut Self>
    where
        F: Fn(&mut RouteContext<'_>) -> Result<Flow> + Send + Sync + 'static,
    {
        if self.has_matched {
            warn!(pattern, "Route mapped after the request was matched");
        }

        let methods = methods.into();
        let route = compile_relative(pattern);
        let handler: Handler = Arc::new(handler);

        // The base path already ends in `/`.
        let canonical = if route.is_empty() {
            String::new()
        } else {
            trailing_slash(&route)
        };
        let alias = untrailing_slash(&route);

        self.table
            .map(methods.clone(), &canonical, Arc::clone(&handler), name)?;
        self.table.map(methods.clone(), alias, handler, None)?;

        debug!(
            pattern,
            canonical = %canonical,
            methods = %methods,
            name = name.unwrap_or_default(),
            "Route mapped"
        );
        Ok(self)
    }

    /// Maps a route answering to every method.
    pub fn any<F>(&mut self, pattern: &str, handler: F, name: Option<&str>) -> Result<&mut Self>
    where
        F: Fn(&mut RouteContext<'_>) -> Result<Flow> + Send + Sync + 'static,
    {
        self.map(pattern, handler, MethodSet::Any, name)
    }

    /// Maps a GET route.
    pub fn get<F>(&mut self, pattern: &str, handler: F, name: Option<&str>) -> Result<&mut Self>
    where
        F: Fn(&mut RouteContext<'_>) -> Result<Flow> + Send + Sync + 'static,
    {
        self.map(pattern, handler, Method::Get, name)
    }

    /// Maps a POST route.
    pub fn post<F>(&mut self, pattern: &str, handler: F, name: Option<&str>) -> Result<&mut Self>
    where
        F: Fn(&mut RouteContext<'_>) -> Result<Flow> + Send + Sync + 'static,
    {
        self.map(pattern, handler, Method::Post, name)
    }

    /// Maps a PUT route.
    pub fn put<F>(&mut self, pattern: &str, handler: F, name: Option<&str>) -> Result<&mut Self>
    where
        F: Fn(&mut RouteContext<'_>) -> Result<Flow> + Send + Sync + 'static,
    {
        self.map(pattern, handler, Method::Put, name)
    }

    /// Maps a DELETE route.
    pub fn delete<F>(&mut self, pattern: &str, handler: F, name: Option<&str>) -> Result<&mut Self>
    where
        F: Fn(&mut RouteContext<'_>) -> Result<Flow> + Send + Sync + 'static,
    {
        self.map(pattern, handler, Method::Delete, name)
    }

    /// Maps a PATCH route.
    pub fn patch<F>(&mut self, pattern: &str, handler: F, name: Option<&str>) -> Result<&mut Self>
    where
        F: Fn(&mut RouteContext<'_>) -> Result<Flow> + Send + Sync + 'static,
    {
        self.map(pattern, handler, Method::Patch, name)
    }

    /// Reacts to a host lifecycle signal by routing the current request.
    pub fn on_signal(&mut self, signal: Signal, cx: &mut RequestContext) -> Result<Dispatch> {
        debug!(?signal, "Lifecycle signal");
        self.match_current_request(cx)
    }

    /// Routes the current request and runs its handler.
    ///
    /// Only the first call does anything; later calls return
    /// [`Dispatch::AlreadyMatched`].
    pub fn match_current_request(&mut self, cx: &mut RequestContext) -> Result<Dispatch> {
        if self.has_matched {
            debug!("Request already matched, skipping");
            return Ok(Dispatch::AlreadyMatched);
        }
        self.has_matched = true;

        let method = cx.request.method;
        let Some(matched) = self.table.match_request(method, &cx.request.uri) else {
            debug!(method = %method, uri = %cx.request.uri, "No route matched");
            return Ok(Dispatch::NoMatch);
        };

        info!(
            method = %method,
            uri = %cx.request.uri,
            pattern = matched.pattern,
            name = matched.name.unwrap_or_default(),
            "Route matched"
        );

        let handler = Arc::clone(matched.target);
        self.current = Some(CurrentRoute {
            name: matched.name.map(str::to_string),
            pattern: matched.pattern.to_string(),
            method,
            params: matched.params.clone(),
        });

        let params = (!matched.params.is_empty()).then_some(matched.params);
        let mut route_cx = RouteContext {
            params,
            request: &cx.request,
            pipeline: &mut cx.pipeline,
            locator: cx.locator.as_ref(),
            urls: Urls {
                table: &self.table,
                site: &self.site,
            },
        };

        let flow = handler(&mut route_cx)?;
        Ok(Dispatch::Handled(flow))
    }

    /// Returns `true` once the current request has been routed.
    pub fn has_matched(&self) -> bool {
        self.has_matched
    }

    /// The route that matched the current request.
    pub fn current_route(&self) -> Option<&CurrentRoute> {
        self.current.as_ref()
    }

    /// URL generation for this router.
    pub fn urls(&self) -> Urls<'_> {
        Urls {
            table: &self.table,
            site: &self.site,
        }
    }

    /// See [`Urls::generate`].
    pub fn generate(
        &self,
        route: &str,
        params: impl Into<RouteParams>,
        method: Option<Method>,
    ) -> Result<String> {
        self.urls().generate(route, params, method)
    }

    /// See [`Urls::generate_absolute`].
    pub fn generate_absolute(
        &self,
        route: &str,
        params: impl Into<RouteParams>,
        method: Option<Method>,
    ) -> Result<String> {
        self.urls().generate_absolute(route, params, method)
    }

    /// See [`Urls::redirect`].
    pub fn redirect(&self, route: &str, params: impl Into<RouteParams>) -> Result<Flow> {
        self.urls().redirect(route, params)
    }

    /// The underlying route table.
    pub fn table(&self) -> &RouteTable<Handler> {
        &self.table
    }

    /// The site configuration.
    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    /// Strips the base path and query string from a request URI.
    pub fn relative_path<'u>(&self, uri: &'u str) -> &'u str {
        self.table.relative_path(uri)
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.table.len())
            .field("site", &self.site)
            .field("has_matched", &self.has_matched)
            .field("current", &self.current)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct NoTemplates;

    impl TemplateLocator for NoTemplates {
        fn is_readable(&self, _reference: &str) -> bool {
            false
        }

        fn locate(&self, _name: &str) -> Option<PathBuf> {
            None
        }
    }

    fn router() -> Router {
        Router::new(SiteConfig::new("https://example.com").unwrap()).unwrap()
    }

    fn context(request: Request) -> RequestContext {
        RequestContext::new(request, Arc::new(NoTemplates))
    }

    fn ok(_: &mut RouteContext<'_>) -> Result<Flow> {
        Ok(Flow::Continue)
    }

    #[test]
    fn test_map_registers_two_entries() {
        let mut router = router();
        router.map("foo", ok, MethodSet::standard(), Some("foo")).unwrap();

        let routes = router.table().routes();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].pattern.source(), "foo/");
        assert_eq!(routes[0].name.as_deref(), Some("foo"));
        assert_eq!(routes[1].pattern.source(), "foo");
        assert_eq!(routes[1].name, None);
    }

    #[test]
    fn test_both_forms_match() {
        for uri in ["/foo/", "/foo"] {
            let calls = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&calls);
            let mut router = router();
            router
                .get(
                    "foo",
                    move |_| {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(Flow::Continue)
                    },
                    None,
                )
                .unwrap();

            let mut cx = context(Request::get(uri));
            let dispatch = router.match_current_request(&mut cx).unwrap();
            assert_eq!(dispatch, Dispatch::Handled(Flow::Continue), "{uri}");
            assert_eq!(calls.load(Ordering::SeqCst), 1, "{uri}");
        }
    }

    #[test]
    fn test_match_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut router = router();
        router
            .get(
                "foo",
                move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(Flow::Continue)
                },
                None,
            )
            .unwrap();

        let mut cx = context(Request::get("/foo/"));
        router.on_signal(Signal::Init, &mut cx).unwrap();
        let second = router.on_signal(Signal::Loaded, &mut cx).unwrap();

        assert_eq!(second, Dispatch::AlreadyMatched);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(router.has_matched());
    }

    #[test]
    fn test_params_passed_only_when_captured() {
        let mut router = router();
        router
            .get(
                "posts/:id",
                |cx| {
                    assert_eq!(cx.param("id"), Some("42"));
                    Ok(Flow::Continue)
                },
                None,
            )
            .unwrap();
        let mut cx = context(Request::get("/posts/42/"));
        router.match_current_request(&mut cx).unwrap();
        assert_eq!(
            router.current_route().unwrap().params.get("id"),
            Some("42")
        );

        let mut router = self::router();
        router
            .get(
                "about",
                |cx| {
                    assert!(cx.params().is_none());
                    Ok(Flow::Continue)
                },
                None,
            )
            .unwrap();
        let mut cx = context(Request::get("/about/"));
        router.match_current_request(&mut cx).unwrap();
    }

    #[test]
    fn test_no_match_falls_through() {
        let mut router = router();
        router.get("foo", ok, None).unwrap();

        let mut cx = context(Request::get("/bar/"));
        assert_eq!(router.match_current_request(&mut cx).unwrap(), Dispatch::NoMatch);
        assert!(router.current_route().is_none());
    }

    #[test]
    fn test_method_filtering() {
        let mut router = router();
        router.post("contact", ok, None).unwrap();

        let mut cx = context(Request::get("/contact/"));
        assert_eq!(router.match_current_request(&mut cx).unwrap(), Dispatch::NoMatch);
    }

    #[test]
    fn test_generate_named_route() {
        let mut router = router();
        router.get("my/:id", ok, Some("myroute")).unwrap();

        assert_eq!(
            router.generate("myroute", [("id", 5)], Some(Method::Get)).unwrap(),
            "/my/5/"
        );
        assert_eq!(
            router.generate_absolute("myroute", [("id", 5)], None).unwrap(),
            "https://example.com/my/5/"
        );
    }

    #[test]
    fn test_generate_inline_pattern() {
        let router = router();
        assert_eq!(
            router.generate("/archive/:year", [("year", 2024)], None).unwrap(),
            "/archive/2024/"
        );
    }

    #[test]
    fn test_generate_unknown_name() {
        let router = router();
        let err = router.generate("nope", RouteParams::new(), None).unwrap_err();
        assert!(matches!(err, RouterError::RouteNotFound(_)));
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let mut router = router();
        router.get("a", ok, Some("dup")).unwrap();
        assert!(matches!(
            router.get("b", ok, Some("dup")),
            Err(RouterError::DuplicateRouteName(_))
        ));
    }

    #[test]
    fn test_redirect_halts() {
        let mut router = router();
        router.get("login", ok, Some("login")).unwrap();
        router
            .get("account", |cx| cx.redirect("login", RouteParams::new()), None)
            .unwrap();

        let mut cx = context(Request::get("/account/"));
        let dispatch = router.match_current_request(&mut cx).unwrap();
        assert_eq!(
            dispatch,
            Dispatch::Handled(Flow::Halt(Redirect::to("/login/")))
        );
    }
}
