//! Route pattern compilation.
//!
//! Application code writes routes with `:name` placeholders:
//!
//! ```
//! use oxide_routes::pattern;
//!
//! assert_eq!(pattern::compile("posts/:id"), "posts/[:id]");
//! assert_eq!(pattern::compile("/shop/:cat/:item"), "/shop/[:cat]/[:item]");
//! ```
//!
//! The compiled form uses the block syntax understood by
//! [`RouteTable`](crate::RouteTable). A pattern that already contains a
//! `[` is assumed to be written in block syntax and is passed through
//! untouched, which is also what makes compilation idempotent.

use std::sync::LazyLock;

use regex::Regex;

/// Marker that identifies an already compiled pattern.
const BLOCK_MARKER: char = '[';

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":[A-Za-z0-9_]+").expect("placeholder regex is valid"));

/// How leading separators are treated during compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompileMode {
    /// Keep the pattern rooted exactly as written.
    #[default]
    PreserveLeadingSlash,
    /// Strip leading separators so the pattern is relative to the site
    /// base path. This is the form the router registers.
    StripLeadingSlash,
}

/// Compiles a pattern, keeping any leading `/`.
pub fn compile(pattern: &str) -> String {
    compile_with(pattern, CompileMode::PreserveLeadingSlash)
}

/// Compiles a pattern relative to the base path (leading `/` removed).
pub fn compile_relative(pattern: &str) -> String {
    compile_with(pattern, CompileMode::StripLeadingSlash)
}

/// Compiles a pattern in the given mode.
pub fn compile_with(pattern: &str, mode: CompileMode) -> String {
    let compiled = if is_compiled(pattern) {
        pattern.to_string()
    } else {
        let replaced = PLACEHOLDER.replace_all(pattern, "/[$0]");
        replaced
            .replace("[[", "[")
            .replace("]]", "]")
            .replace("[/:", "[:")
            .replace("//[", "/[")
    };

    match mode {
        CompileMode::PreserveLeadingSlash => compiled,
        CompileMode::StripLeadingSlash => compiled.trim_start_matches('/').to_string(),
    }
}

/// Returns `true` if the pattern is already in block syntax.
pub fn is_compiled(pattern: &str) -> bool {
    pattern.contains(BLOCK_MARKER)
}

/// Appends a single trailing `/`, collapsing any existing ones.
pub(crate) fn trailing_slash(route: &str) -> String {
    format!("{}/", untrailing_slash(route))
}

/// Removes every trailing `/`.
pub(crate) fn untrailing_slash(route: &str) -> &str {
    route.trim_end_matches(&['/', '\\'][..])
}
