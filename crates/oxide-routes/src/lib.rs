//! # oxide-routes
//!
//! Pattern-based URL routing with deferred response dispatch.
//!
//! This crate provides:
//! - `:name` route patterns compiled to block syntax
//! - A router that matches the current request exactly once
//! - Named routes for URL generation and redirects
//! - Response declarations (template, data, status, query) realized later
//!   through the host's extension points
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use oxide_routes::{
//!     Flow, Request, RequestContext, RequestLifecycle, ResponseDeclaration, Router,
//!     SiteConfig, ThemeLocator,
//! };
//! use serde_json::json;
//!
//! let mut router = Router::new(SiteConfig::new("https://example.com")?)?;
//! router.get("posts/:id", |cx| {
//!     let id = cx.param("id").unwrap_or_default().to_string();
//!     cx.declare(ResponseDeclaration::new("single.php").params(json!({ "id": id })));
//!     Ok(Flow::Continue)
//! }, Some("post"))?;
//!
//! let locator = Arc::new(ThemeLocator::new().dir("themes/child").dir("themes/base"));
//! let mut cx = RequestContext::new(Request::get("/posts/5/"), locator);
//! let resolution = RequestLifecycle::default().run(&mut router, &mut cx)?;
//! ```
//!
//! ## Patterns
//!
//! `posts/:id` compiles to `posts/[:id]`. Each mapped pattern is registered
//! twice: `posts/[:id]/` (the canonical form, which carries the name) and
//! `posts/[:id]`. Patterns already written in block syntax are used as-is:
//!
//! ```ignore
//! router.get("archive/[i:year]/[i:month]?", archive, Some("archive"))?;
//! ```
//!
//! ## URL Generation
//!
//! ```ignore
//! let url = router.generate("post", [("id", 5)], None)?;
//! assert_eq!(url, "/posts/5/");
//!
//! let absolute = router.generate_absolute("post", [("id", 5)], None)?;
//! assert_eq!(absolute, "https://example.com/posts/5/");
//! ```
//!
//! Handlers stop the request with a redirect by returning its flow:
//!
//! ```ignore
//! router.get("old-posts/:id", |cx| {
//!     let id = cx.param("id").unwrap_or_default().to_string();
//!     cx.redirect("post", [("id", id)])
//! }, None)?;
//! ```

pub mod dispatcher;
mod error;
pub mod hooks;
pub mod lifecycle;
pub mod pattern;
mod pipeline;
pub mod query;
mod request;
mod response;
mod router;
mod site;
pub mod table;
mod template;

pub use dispatcher::{ResponseDeclaration, ResponseDispatcher};
pub use error::{Result, RouterError};
pub use hooks::{DEFAULT_PRIORITY, HookPoint, Hooks, ListenerId, ParseRequest, StatusLine};
pub use lifecycle::{Rendering, RequestLifecycle, Resolution};
pub use pipeline::{CurrentTemplate, RequestContext, ResponsePipeline};
pub use query::{QueryOverride, QueryState, QueryVars};
pub use request::{Method, MethodSet, Request, RouteParams};
pub use response::{Flow, Redirect, status_text};
pub use router::{CurrentRoute, Dispatch, Handler, RouteContext, Router, Signal, Urls};
pub use site::SiteConfig;
pub use table::{RouteMatch, RoutePattern, RouteTable};
pub use template::{TemplateLocator, ThemeLocator};
