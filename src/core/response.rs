//! HTTP response abstraction produced by the dispatcher.

use bytes::Bytes;
use http::header::{self, HeaderName};
use http::{HeaderMap, HeaderValue, StatusCode};

/// HTTP response.
///
/// Note: Clone is intentionally not derived to prevent expensive copies.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// Create a new response builder.
    #[inline]
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder::new()
    }

    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[inline]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Get a header value by string name (case-insensitive).
    #[inline]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Get Content-Type header.
    #[inline]
    pub fn content_type(&self) -> Option<&str> {
        self.header(header::CONTENT_TYPE.as_str())
    }

    /// Add a header (fast path with HeaderName + HeaderValue).
    #[inline]
    pub fn with_header_value(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[inline]
    pub fn body_len(&self) -> usize {
        self.body.len()
    }
}

impl From<Response> for http::Response<Bytes> {
    fn from(res: Response) -> Self {
        let mut http_res = http::Response::new(res.body);
        *http_res.status_mut() = res.status;
        *http_res.headers_mut() = res.headers;
        http_res
    }
}

/// Builder for creating HTTP responses.
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Option<HeaderMap>, // Lazy allocation
    body: Bytes,
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseBuilder {
    #[inline]
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: None,
            body: Bytes::new(),
        }
    }

    #[inline]
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Add header with typed HeaderName and HeaderValue (zero-alloc for static values).
    #[inline]
    pub fn header_value(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers
            .get_or_insert_with(HeaderMap::new)
            .insert(name, value);
        self
    }

    #[inline]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    #[inline]
    pub fn build(self) -> Response {
        Response {
            status: self.status,
            headers: self.headers.unwrap_or_default(),
            body: self.body,
        }
    }
}
