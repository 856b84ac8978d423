//! JSON response envelope.
//!
//! Every response leaving the dispatcher carries the same security headers.
//! Success bodies are the encoded reply, failures are
//! `{"httpError":"<message>"}` (or the raw error body when echoing is on).

use bytes::Bytes;
use http::header;
use http::{HeaderValue, StatusCode};
use serde::Serialize;

use super::Reply;
use crate::core::{HttpError, Response, ResponseBuilder};

/// Body sent when a reply or error cannot be encoded.
pub const ENCODE_FAILURE_BODY: &str = "{\"httpError\": \"InternalServerError\"}";

const JSON_UTF8: HeaderValue = HeaderValue::from_static("application/json; charset=utf-8");
const NOSNIFF: HeaderValue = HeaderValue::from_static("nosniff");
const SAMEORIGIN: HeaderValue = HeaderValue::from_static("sameorigin");
const NO_CACHE: HeaderValue = HeaderValue::from_static("no-cache");

#[derive(Serialize)]
struct ErrorBody<'a> {
    #[serde(rename = "httpError")]
    http_error: &'a str,
}

fn envelope(status: StatusCode) -> ResponseBuilder {
    Response::builder()
        .status(status)
        .header_value(header::CONTENT_TYPE, JSON_UTF8)
        .header_value(header::X_CONTENT_TYPE_OPTIONS, NOSNIFF)
        .header_value(header::X_FRAME_OPTIONS, SAMEORIGIN)
        .header_value(header::CACHE_CONTROL, NO_CACHE)
}

fn encode_failure() -> Response {
    envelope(StatusCode::INTERNAL_SERVER_ERROR)
        .body(Bytes::from_static(ENCODE_FAILURE_BODY.as_bytes()))
        .build()
}

/// Render a successful reply.
pub fn render_reply(reply: Reply) -> Response {
    match reply {
        Reply::Json(body) => envelope(StatusCode::OK).body(body).build(),
        Reply::Redirect { location, status } => match HeaderValue::try_from(location) {
            Ok(location) => envelope(status)
                .header_value(header::LOCATION, location)
                .build(),
            Err(e) => {
                tracing::error!(error = %e, "redirect location is not a valid header value");
                encode_failure()
            }
        },
        Reply::EncodeFailed(e) => {
            tracing::error!(error = %e, "failed to encode reply");
            encode_failure()
        }
    }
}

/// Render a structured error.
///
/// With `echo_body` set and a raw body attached, the raw body is sent
/// verbatim instead of the JSON envelope.
pub fn render_error(err: &HttpError, echo_body: bool) -> Response {
    if echo_body {
        if let Some(body) = err.body() {
            return envelope(err.status()).body(body.clone()).build();
        }
    }

    match serde_json::to_vec(&ErrorBody {
        http_error: err.message(),
    }) {
        Ok(body) => envelope(err.status()).body(body).build(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode error body");
            encode_failure()
        }
    }
}
