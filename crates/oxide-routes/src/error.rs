//! Error types for routing.

use thiserror::Error;

/// Router-specific errors.
///
/// An unmatched request is not represented here: it falls through to the
/// host's default handling.
#[derive(Debug, Error)]
pub enum RouterError {
    /// No route is registered under this name.
    #[error("route not found: {0}")]
    RouteNotFound(String),

    /// A route with this name is already registered.
    #[error("cannot redeclare route: {0}")]
    DuplicateRouteName(String),

    /// The route pattern did not compile to a valid matcher.
    #[error("invalid route pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// The underlying regex error.
        #[source]
        source: regex::Error,
    },

    /// A required parameter was not supplied for URL generation.
    #[error("missing parameter '{param}' for route '{route}'")]
    MissingParam {
        /// The route being generated.
        route: String,
        /// The missing parameter.
        param: String,
    },

    /// The named route does not accept the requested method.
    #[error("method not allowed: {method} for route '{route}'")]
    MethodNotAllowed {
        /// The requested method.
        method: String,
        /// The route name.
        route: String,
    },

    /// The configured site URL could not be parsed.
    #[error("invalid site url: {0}")]
    InvalidSiteUrl(#[from] url::ParseError),
}

/// Result type alias for router operations.
pub type Result<T> = std::result::Result<T, RouterError>;
