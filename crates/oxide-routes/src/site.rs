//! Site configuration: base URL, base path and URL rewriting.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use url::Url;

use crate::error::Result;

/// Where the site lives.
///
/// Deserializable so hosts can embed it in their own configuration:
///
/// ```
/// use oxide_routes::SiteConfig;
///
/// let site: SiteConfig = serde_json::from_str(r#"{"url": "https://example.com/blog"}"#).unwrap();
/// assert_eq!(site.base_path().unwrap(), "/blog/");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SiteConfig {
    /// Public site URL, e.g. `https://example.com/blog`.
    pub url: String,
    /// Filesystem directory the site is installed in.
    #[serde(default)]
    pub root: Option<PathBuf>,
}

impl SiteConfig {
    /// Creates a config, validating the URL.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let config = Self {
            url: url.into(),
            root: None,
        };
        config.base_path()?;
        Ok(config)
    }

    /// Sets the install directory used by [`SiteConfig::path_to_url`].
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// The path component of the site URL, always ending in `/`.
    pub fn base_path(&self) -> Result<String> {
        let parsed = Url::parse(&self.url)?;
        Ok(trailing(parsed.path()))
    }

    /// The site URL with a trailing `/`.
    pub fn base_url(&self) -> String {
        trailing(&self.url)
    }

    /// Rewrites a base-path-relative URL into an absolute one.
    ///
    /// A URL beginning with the base path has it replaced by the base URL;
    /// any other URL rooted at `/` is resolved against the site origin.
    pub fn absolute(&self, url: &str) -> Result<String> {
        let base_path = self.base_path()?;
        let base_url = self.base_url();

        let mut url = match url.strip_prefix(base_path.as_str()) {
            Some(rest) => format!("{base_url}{rest}"),
            None => url.to_string(),
        };

        if let Some(rest) = url.strip_prefix('/') {
            let root_url = base_url
                .strip_suffix(base_path.as_str())
                .map_or_else(|| base_url.clone(), |origin| format!("{origin}/"));
            url = format!("{root_url}{rest}");
        }

        Ok(url)
    }

    /// Maps a file inside the install root to its public URL.
    ///
    /// Returns `None` when no root is configured, the file does not exist,
    /// or it lies outside the root.
    pub fn path_to_url(&self, path: impl AsRef<Path>) -> Option<String> {
        let root = self.root.as_ref()?.canonicalize().ok()?;
        let path = path.as_ref().canonicalize().ok()?;
        if !path.is_file() {
            return None;
        }
        let relative = path.strip_prefix(&root).ok()?;
        let relative: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(format!("{}{}", self.base_url(), relative.join("/")))
    }
}

fn trailing(s: &str) -> String {
    format!("{}/", s.trim_end_matches('/'))
}
