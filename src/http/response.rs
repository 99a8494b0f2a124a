use std::sync::OnceLock;

use bytes::{BufMut, Bytes, BytesMut};

const HTTP_VERSION: &str = "HTTP/1.1";

/// Content type sent with every response.
pub const CONTENT_TYPE: &str = "text/html; charset=utf-8";

const DEFAULT_BODY: &str = "<!doctype html>\r\n\
<html lang=\"en\">\r\n\
<head>\r\n\
<title>KISS Httpd Test Page</title>\r\n\
</head>\r\n\
<body><h1>KISS Httpd Test Page</h1>\
<p>KISS is in this case acronym: Keep It Simple, Stupid!</p></body></html>";

const NOT_FOUND_BODY: &str = "<!doctype html>\r\n\
<html lang=\"en\">\r\n\
<head>\r\n\
<title>KISS Httpd Error 404: Not Found</title>\r\n\
</head>\r\n\
<body><h1>KISS Httpd Error 404: Not Found</h1></body></html>";

/// HTTP status codes the server can answer with.
///
/// - `Ok` (200): root page
/// - `NotFound` (404): anything else
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 404 Not Found
    NotFound,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use kiss_httpd::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::NotFound => 404,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::NotFound => "Not Found",
        }
    }
}

/// A complete HTTP response, prepared once and then written verbatim.
///
/// Headers keep insertion order so that the serialized bytes are stable.
#[derive(Debug, Clone)]
pub struct Response {
    /// The HTTP status code
    pub status: StatusCode,
    /// HTTP headers in the order they are written
    pub headers: Vec<(String, String)>,
    /// Response body as bytes
    pub body: Bytes,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// Unlike a general purpose server no `Content-Length` is added: the
/// connection is closed after every response, which delimits the body.
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Adds or replaces a header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.headers.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.headers.push((key, value)),
        }
        self
    }

    /// Sets the response body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn build(self) -> Response {
        Response {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

impl Response {
    /// Serializes the status line, headers, separator and body.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(head_len(self) + self.body.len());
        write_head(&mut buf, self.status, &self.headers);
        buf.put_slice(&self.body);
        buf.freeze()
    }
}

fn head_len(resp: &Response) -> usize {
    let headers: usize = resp
        .headers
        .iter()
        .map(|(k, v)| k.len() + v.len() + 4)
        .sum();
    // "<version> <code> <reason>\r\n" ... "\r\n"
    HTTP_VERSION.len() + 7 + resp.status.reason_phrase().len() + headers + 2
}

fn write_head(buf: &mut BytesMut, status: StatusCode, headers: &[(String, String)]) {
    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        status.as_u16(),
        status.reason_phrase()
    );
    buf.put_slice(status_line.as_bytes());

    for (k, v) in headers {
        buf.put_slice(k.as_bytes());
        buf.put_slice(b": ");
        buf.put_slice(v.as_bytes());
        buf.put_slice(b"\r\n");
    }

    // Header/body separator
    buf.put_slice(b"\r\n");
}

/// Status line and headers placed in front of a loaded content file.
pub fn header_prefix() -> &'static [u8] {
    static PREFIX: OnceLock<Bytes> = OnceLock::new();
    PREFIX.get_or_init(|| {
        ResponseBuilder::new(StatusCode::Ok)
            .header("Content-Type", CONTENT_TYPE)
            .build()
            .to_bytes()
    })
}

/// Built-in 200 page served when no content file is loaded.
pub fn default_page() -> &'static [u8] {
    static PAGE: OnceLock<Bytes> = OnceLock::new();
    PAGE.get_or_init(|| {
        ResponseBuilder::new(StatusCode::Ok)
            .header("Content-Type", CONTENT_TYPE)
            .body(DEFAULT_BODY)
            .build()
            .to_bytes()
    })
}

/// Built-in 404 page.
pub fn not_found_page() -> &'static [u8] {
    static PAGE: OnceLock<Bytes> = OnceLock::new();
    PAGE.get_or_init(|| {
        ResponseBuilder::new(StatusCode::NotFound)
            .header("Content-Type", CONTENT_TYPE)
            .body(NOT_FOUND_BODY)
            .build()
            .to_bytes()
    })
}
