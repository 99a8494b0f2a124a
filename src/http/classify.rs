//! Request classification.
//!
//! The server does not parse requests. It looks at two bytes right after a
//! three-letter method token and treats `"/ "` there as a request for the
//! root page. `GET / HTTP/1.1` is valid; `POST / HTTP/1.1` and
//! `GET /index.html HTTP/1.1` are not. Known limitation; the rule stays
//! literal.

/// Offset of the byte following `"GET "`.
pub const ROOT_PATH_OFFSET: usize = 4;

const ROOT_PATH_MARKER: &[u8; 2] = b"/ ";

/// Outcome of looking at an incoming request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Serve the current content page.
    Valid,
    /// Serve the built-in 404 page.
    Invalid,
}

impl Classification {
    pub fn is_valid(self) -> bool {
        self == Classification::Valid
    }
}

/// Classifies whatever arrived in the first read on a connection.
///
/// # Example
///
/// ```
/// # use kiss_httpd::http::classify::{classify, Classification};
/// assert_eq!(classify(b"GET / HTTP/1.1\r\n"), Classification::Valid);
/// assert_eq!(classify(b"POST /x HTTP/1.1\r\n"), Classification::Invalid);
/// assert_eq!(classify(b"GET"), Classification::Invalid);
/// ```
pub fn classify(buf: &[u8]) -> Classification {
    match buf.get(ROOT_PATH_OFFSET..ROOT_PATH_OFFSET + ROOT_PATH_MARKER.len()) {
        Some(marker) if marker == ROOT_PATH_MARKER => Classification::Valid,
        _ => Classification::Invalid,
    }
}
