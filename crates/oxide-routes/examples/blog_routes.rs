//! Routes a handful of blog requests through a theme on disk.
//!
//! Run with `cargo run --example blog_routes -- -v` for debug output.

use std::error::Error;
use std::fs;
use std::sync::Arc;

use oxide_routes::{
    Flow, Request, RequestContext, RequestLifecycle, Resolution, ResponseDeclaration, Router,
    SiteConfig, ThemeLocator,
};
use serde_json::json;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<(), Box<dyn Error>> {
    let verbose = std::env::args().any(|arg| arg == "-v" || arg == "--verbose");
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let theme = tempfile::tempdir()?;
    for template in ["single.php", "archive.php", "404.php"] {
        fs::write(theme.path().join(template), format!("<!-- {template} -->"))?;
    }
    let locator = Arc::new(ThemeLocator::new().dir(theme.path()));

    let router = routes()?;
    let post = router.generate_absolute("post", [("slug", "hello-world")], None)?;
    info!(url = %post, "Generated post URL");

    for uri in [
        "/blog/posts/hello-world/",
        "/blog/archive/2024",
        "/blog/p/hello-world",
        "/blog/missing/",
    ] {
        // Routing happens once per request.
        let mut router = routes()?;
        let mut cx = RequestContext::new(Request::get(uri), locator.clone());
        match RequestLifecycle::default().run(&mut router, &mut cx)? {
            Resolution::Redirect(redirect) => info!(
                uri,
                location = %redirect.location,
                status = redirect.status,
                "Redirect"
            ),
            Resolution::Render(rendering) => info!(
                uri,
                status = %rendering.status_line,
                template = %rendering.template.display(),
                data = ?rendering.template_data,
                "Render"
            ),
        }
    }

    Ok(())
}

fn routes() -> oxide_routes::Result<Router> {
    let mut router = Router::new(SiteConfig::new("https://example.com/blog")?)?;
    router.get(
        "posts/:slug",
        |cx| {
            let slug = cx.param("slug").unwrap_or_default().to_string();
            cx.declare(ResponseDeclaration::new("single.php").params(json!({ "slug": slug })));
            Ok(Flow::Continue)
        },
        Some("post"),
    )?;
    router.get(
        "archive/[i:year]",
        |cx| {
            let year = cx.param("year").unwrap_or_default().to_string();
            cx.declare(
                ResponseDeclaration::new("archive.php")
                    .query(format!("year={year}"))
                    .status(200),
            );
            Ok(Flow::Continue)
        },
        Some("archive"),
    )?;
    router.get(
        "p/:slug",
        |cx| {
            let slug = cx.param("slug").unwrap_or_default().to_string();
            cx.redirect("post", [("slug", slug)])
        },
        None,
    )?;

    Ok(router)
}
