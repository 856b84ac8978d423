//! HTTP request abstraction for pre-processors and route logic.

use std::borrow::Cow;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use http::header;
use http::{HeaderMap, Method, Uri};
use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;

use super::context::{ContextKey, RequestContext};

/// HTTP request with a fully buffered body and the context it is served under.
///
/// Note: Clone is intentionally not derived to prevent expensive copies.
#[derive(Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    version: http::Version,
    context: RequestContext,
}

impl Request {
    /// Create a new request bound to a detached context.
    #[inline]
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
            version: http::Version::HTTP_11,
            context: RequestContext::detached(),
        }
    }

    /// Rebind the request to another context.
    #[inline]
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    /// Context the request is being served under.
    #[inline]
    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    /// Shortcut for `self.context().value::<K>()`.
    #[inline]
    pub fn value<K: ContextKey>(&self) -> Option<&K::Value> {
        self.context.value::<K>()
    }

    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[inline]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    #[inline]
    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    #[inline]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    #[inline]
    pub fn version(&self) -> http::Version {
        self.version
    }

    /// Get a header value by name (case-insensitive).
    #[inline]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Get X-Request-ID header.
    #[inline]
    pub fn request_id(&self) -> Option<&str> {
        self.header("x-request-id")
    }

    /// First value of a query parameter, form-decoded.
    ///
    /// Returns `None` when the parameter is absent; an empty value yields
    /// `Some("")`.
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.query()?.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (form_decode(key) == name).then(|| form_decode(value).into_owned())
        })
    }

    /// Credentials from an `Authorization: Basic` header.
    pub fn basic_auth(&self) -> Option<(String, String)> {
        let value = self
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())?;
        let (scheme, encoded) = value.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = BASE64.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (user, pass) = decoded.split_once(':')?;
        Some((user.to_string(), pass.to_string()))
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Decode one `application/x-www-form-urlencoded` component.
fn form_decode(s: &str) -> Cow<'_, str> {
    if s.contains('+') {
        let replaced = s.replace('+', " ");
        Cow::Owned(percent_decode_str(&replaced).decode_utf8_lossy().into_owned())
    } else {
        percent_decode_str(s).decode_utf8_lossy()
    }
}

impl<B> From<http::Request<B>> for Request
where
    B: Into<Bytes>,
{
    fn from(req: http::Request<B>) -> Self {
        let (parts, body) = req.into_parts();
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body: body.into(),
            version: parts.version,
            context: RequestContext::detached(),
        }
    }
}
