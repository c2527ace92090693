//! Handler outcomes and status text.

/// An HTTP redirect issued by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    /// Target URL.
    pub location: String,
    /// HTTP status code.
    pub status: u16,
}

impl Redirect {
    /// Creates a temporary (302) redirect.
    pub fn to(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            status: 302,
        }
    }

    /// Creates a permanent (301) redirect.
    pub fn permanent(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            status: 301,
        }
    }

    /// Returns the `Location` header pair.
    pub fn header(&self) -> (&'static str, &str) {
        ("Location", &self.location)
    }
}

/// What a handler tells the host once it returns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Flow {
    /// Keep processing the request.
    #[default]
    Continue,
    /// Stop processing and send this redirect.
    Halt(Redirect),
}

impl Flow {
    /// Returns `true` if request processing must stop.
    pub fn is_halt(&self) -> bool {
        matches!(self, Self::Halt(_))
    }
}

/// Returns the reason phrase for a status code.
pub fn status_text(status: u16) -> &'static str {
    match status {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        206 => "Partial Content",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        410 => "Gone",
        418 => "I'm a teapot",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect() {
        let redirect = Redirect::to("/login/");
        assert_eq!(redirect.status, 302);
        assert_eq!(redirect.header(), ("Location", "/login/"));
        assert_eq!(Redirect::permanent("/new/").status, 301);
    }

    #[test]
    fn test_flow() {
        assert!(!Flow::default().is_halt());
        assert!(Flow::Halt(Redirect::to("/")).is_halt());
    }

    #[test]
    fn test_status_text() {
        assert_eq!(status_text(200), "OK");
        assert_eq!(status_text(404), "Not Found");
        assert_eq!(status_text(410), "Gone");
        assert_eq!(status_text(299), "");
    }
}
