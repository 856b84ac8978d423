//! Structured HTTP errors returned by pre-processors and route logic.

use std::borrow::Cow;
use std::fmt;

use bytes::Bytes;
use http::StatusCode;

/// Boxed diagnostic cause. Logged by the dispatcher, never sent to clients.
pub type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error value that maps onto exactly one HTTP error response.
///
/// Carries the status code, an optional internal cause for the server log,
/// the client-facing message used by the JSON envelope, and an optional raw
/// body (e.g. the offending input of a 400) that replaces the envelope when
/// the body-echo policy is enabled.
pub struct HttpError {
    status: StatusCode,
    message: Cow<'static, str>,
    cause: Option<Cause>,
    body: Option<Bytes>,
}

impl HttpError {
    /// Create an error with an arbitrary status.
    ///
    /// Statuses that are not 4xx/5xx are coerced to 500 so that an error can
    /// never be rendered as a success.
    pub fn new(status: StatusCode, message: impl Into<Cow<'static, str>>) -> Self {
        let status = if status.is_client_error() || status.is_server_error() {
            status
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: message.into(),
            cause: None,
            body: None,
        }
    }

    /// 400 Bad Request.
    #[inline]
    pub fn bad_request(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 403 Forbidden.
    #[inline]
    pub fn forbidden(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    /// 404 Not Found.
    #[inline]
    pub fn not_found(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// 405 Method Not Allowed.
    #[inline]
    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed.")
    }

    /// 500 Internal Server Error.
    #[inline]
    pub fn internal(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Attach the underlying cause.
    #[inline]
    pub fn with_cause(mut self, cause: impl Into<Cause>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Attach a raw body to echo back to the client.
    #[inline]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[inline]
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    #[inline]
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }
}

impl fmt::Debug for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpError")
            .field("status", &self.status.as_u16())
            .field("message", &self.message)
            .field("cause", &self.cause.as_ref().map(|c| c.to_string()))
            .field("body_len", &self.body.as_ref().map(Bytes::len))
            .finish()
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{} {}: {}", self.status.as_u16(), self.message, cause),
            None => write!(f, "{} {}", self.status.as_u16(), self.message),
        }
    }
}

impl std::error::Error for HttpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|c| c as &(dyn std::error::Error + 'static))
    }
}

/// Result alias for pipeline stages.
pub type Result<T> = std::result::Result<T, HttpError>;
