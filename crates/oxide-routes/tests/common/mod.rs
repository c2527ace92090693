#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use oxide_routes::{
    Request, RequestContext, RequestLifecycle, Rendering, Resolution, Router, SiteConfig,
    TemplateLocator,
};

/// Theme whose templates exist only in memory.
pub struct MemoryTheme {
    templates: HashSet<String>,
}

impl MemoryTheme {
    pub fn new(templates: &[&str]) -> Self {
        Self {
            templates: templates.iter().map(|t| (*t).to_string()).collect(),
        }
    }
}

impl TemplateLocator for MemoryTheme {
    fn is_readable(&self, reference: &str) -> bool {
        reference.starts_with('/') && self.templates.contains(reference)
    }

    fn locate(&self, name: &str) -> Option<PathBuf> {
        self.templates
            .contains(name)
            .then(|| Path::new("/theme").join(name))
    }
}

pub fn theme() -> Arc<MemoryTheme> {
    Arc::new(MemoryTheme::new(&[
        "single.php",
        "page.php",
        "archive.php",
        "404.php",
        "/srv/custom/landing.php",
    ]))
}

pub fn router() -> Router {
    router_at("https://example.com")
}

pub fn router_at(url: &str) -> Router {
    Router::new(SiteConfig::new(url).unwrap()).unwrap()
}

pub fn context(request: Request) -> RequestContext {
    RequestContext::new(request, theme())
}

pub fn run(router: &mut Router, request: Request) -> Resolution {
    let mut cx = context(request);
    RequestLifecycle::default()
        .run(router, &mut cx)
        .unwrap_or_else(|e| panic!("Lifecycle failed: {e}"))
}

pub fn render(router: &mut Router, request: Request) -> Rendering {
    match run(router, request) {
        Resolution::Render(rendering) => rendering,
        other => panic!("Expected rendering, got {other:?}"),
    }
}
