//! Dispatch-ready handler.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use http::header::HeaderName;
use http::{HeaderValue, Method, Version};
use tracing::{debug, error, info};

use super::envelope::{render_error, render_reply};
use super::{PreProcessor, PreProcessorChain, Reply, RouteHandler};
use crate::core::{generate_request_id, ApplicationContext, HttpError, Request, Response, Result};

/// Route logic bound to a context and a pre-processor chain.
///
/// Cloning is cheap; clones share the route logic and the chain snapshot.
#[derive(Clone)]
pub struct Handler {
    context: ApplicationContext,
    chain: PreProcessorChain,
    route: Arc<dyn RouteHandler>,
    echo_body: bool,
}

impl Handler {
    pub(super) fn new(
        context: ApplicationContext,
        chain: PreProcessorChain,
        route: Arc<dyn RouteHandler>,
        echo_body: bool,
    ) -> Self {
        Self {
            context,
            chain,
            route,
            echo_body,
        }
    }

    /// Append a pre-processor that only this handler runs, after the
    /// factory's chain.
    pub fn before_handler<P: PreProcessor + 'static>(mut self, processor: P) -> Self {
        self.chain.push(Arc::new(processor));
        self
    }

    /// Pre-processor names in execution order.
    pub fn chain_names(&self) -> Vec<&'static str> {
        self.chain.names()
    }

    /// Serve one request.
    ///
    /// The request runs under a fresh child of the application context. That
    /// context is cancelled when this future completes or is dropped,
    /// whichever stage ended the request. Exactly one response is produced.
    pub async fn serve(&self, req: Request) -> Response {
        let request_id = req
            .request_id()
            .map(str::to_owned)
            .unwrap_or_else(generate_request_id);
        let ctx = self.context.derive(request_id);
        let _guard = ctx.cancel_on_drop();

        let line = RequestLine::of(&req);
        let req = req.with_context(ctx.clone());

        let response = match AssertUnwindSafe(self.dispatch(req)).catch_unwind().await {
            Ok(Ok(reply)) => render_reply(reply),
            Ok(Err(err)) => {
                if err.status().is_server_error() {
                    error!(
                        request_id = %ctx.request_id,
                        status = err.status().as_u16(),
                        cause = ?err.cause().map(ToString::to_string),
                        "{}",
                        err.message()
                    );
                } else {
                    debug!(
                        request_id = %ctx.request_id,
                        status = err.status().as_u16(),
                        cause = ?err.cause().map(ToString::to_string),
                        "{}",
                        err.message()
                    );
                }
                render_error(&err, self.echo_body)
            }
            Err(panic) => {
                error!(
                    request_id = %ctx.request_id,
                    panic = panic_message(panic.as_ref()),
                    "route panicked"
                );
                render_error(&HttpError::internal("InternalServerError"), false)
            }
        };

        finish(response, &line, &ctx.request_id, ctx.elapsed_ms())
    }

    async fn dispatch(&self, mut req: Request) -> Result<Reply> {
        self.chain.run(&mut req).await?;
        self.route.call(req).await
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("chain", &self.chain)
            .field("echo_body", &self.echo_body)
            .finish()
    }
}

/// Method, path and protocol version of a request, kept for its access event.
#[derive(Debug, Clone)]
pub(crate) struct RequestLine {
    method: Method,
    path: String,
    version: Version,
}

impl RequestLine {
    pub(crate) fn of(req: &Request) -> Self {
        Self {
            method: req.method().clone(),
            path: req.path().to_owned(),
            version: req.version(),
        }
    }
}

/// Stamp `x-request-id` on a finished response and emit its access event.
pub(crate) fn finish(
    response: Response,
    line: &RequestLine,
    request_id: &str,
    duration_ms: f64,
) -> Response {
    let response = match HeaderValue::from_str(request_id) {
        Ok(value) => response.with_header_value(HeaderName::from_static("x-request-id"), value),
        Err(_) => response,
    };

    info!(
        target: "access",
        method = %line.method,
        path = %line.path,
        version = ?line.version,
        status = response.status().as_u16(),
        bytes = response.body_len() as u64,
        duration_ms,
        request_id,
        "request completed"
    );

    response
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
