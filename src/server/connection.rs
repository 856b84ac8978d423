//! Per-request conversion between hyper and the dispatch pipeline.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use tracing::debug;

use crate::core::{generate_request_id, HttpError, Request, Response};
use crate::router::{finish, render_error, RequestLine, Router};

/// Shared state for every connection accepted by one server.
pub(super) struct ConnectionContext {
    pub router: Arc<Router>,
    pub max_body_bytes: usize,
}

impl ConnectionContext {
    /// Buffer the body, dispatch, and convert back to a hyper response.
    pub async fn handle_request(
        &self,
        req: http::Request<Incoming>,
    ) -> Result<http::Response<Full<Bytes>>, Infallible> {
        let started = Instant::now();
        let (parts, body) = req.into_parts();

        let response = match Limited::new(body, self.max_body_bytes).collect().await {
            Ok(collected) => {
                let request = Request::from(http::Request::from_parts(parts, collected.to_bytes()));
                self.router.dispatch(request).await
            }
            Err(e) => {
                let request = Request::from(http::Request::from_parts(parts, Bytes::new()));
                body_error(&request, e, started)
            }
        };

        Ok(http::Response::<Bytes>::from(response).map(Full::new))
    }
}

/// Answer a request whose body could not be buffered. Runs outside any
/// [`Handler`](crate::router::Handler), so it stamps the request id and emits
/// the access event itself.
fn body_error(
    req: &Request,
    e: Box<dyn std::error::Error + Send + Sync>,
    started: Instant,
) -> Response {
    let err = if e.downcast_ref::<LengthLimitError>().is_some() {
        HttpError::new(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large")
    } else {
        HttpError::bad_request("Failed to read request body")
    };
    let request_id = req
        .request_id()
        .map(str::to_owned)
        .unwrap_or_else(generate_request_id);

    debug!(
        request_id = %request_id,
        path = req.path(),
        status = err.status().as_u16(),
        error = %e,
        "request body rejected"
    );

    let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
    finish(
        render_error(&err, false),
        &RequestLine::of(req),
        &request_id,
        duration_ms,
    )
}
