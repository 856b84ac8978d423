//! Request dispatch pipeline.
//!
//! A [`HandlerFactory`] binds the application context and an ordered chain
//! of pre-processors to route logic, producing dispatch-ready [`Handler`]s.
//! A [`Router`] maps request paths onto those handlers.
//!
//! # Lifecycle
//!
//! ```text
//! ENTER ─→ PRE_PROCESS(0) ─→ ... ─→ PRE_PROCESS(n) ─→ ROUTE ─→ RESPOND ─→ EXIT
//!               │                         │             │
//!               └──── HttpError ──────────┴─────────────┴─→ RESPOND (error envelope)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use golinks::router::{HandlerFactory, Reply, Router};
//!
//! let factory = HandlerFactory::new(app_ctx)?
//!     .before_handler(|req: &mut Request| -> golinks::core::Result<()> {
//!         tracing::debug!(path = req.path(), "incoming");
//!         Ok(())
//!     });
//!
//! async fn ping(_req: Request) -> golinks::core::Result<Reply> {
//!     Ok(Reply::json(&"pong"))
//! }
//!
//! let router = Router::new().route("/ping", factory.new_handler(ping));
//! ```

mod chain;
mod envelope;
mod factory;
mod handler;
mod routing;

use std::future::Future;

use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;
use serde::Serialize;

use crate::core::{Request, Result};

pub use chain::PreProcessorChain;
pub use envelope::{render_error, render_reply, ENCODE_FAILURE_BODY};
pub use factory::{ConfigKey, HandlerFactory, WiringError};
pub use handler::Handler;
pub(crate) use handler::{finish, RequestLine};
pub use routing::Router;

/// Step run before route logic.
///
/// Pre-processors run strictly in registration order. Returning an error
/// stops the pipeline: no later pre-processor and no route logic runs, and
/// the error is rendered as the response.
#[async_trait]
pub trait PreProcessor: Send + Sync {
    /// Name used when logging short-circuits.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Inspect or modify the request.
    async fn before(&self, req: &mut Request) -> Result<()>;
}

#[async_trait]
impl<F> PreProcessor for F
where
    F: Fn(&mut Request) -> Result<()> + Send + Sync + 'static,
{
    async fn before(&self, req: &mut Request) -> Result<()> {
        (self)(req)
    }
}

/// Route logic: request in, reply or structured error out.
#[async_trait]
pub trait RouteHandler: Send + Sync {
    async fn call(&self, req: Request) -> Result<Reply>;
}

#[async_trait]
impl<F, Fut> RouteHandler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Reply>> + Send + 'static,
{
    async fn call(&self, req: Request) -> Result<Reply> {
        (self)(req).await
    }
}

/// Successful outcome of route logic, rendered by the response envelope.
#[derive(Debug)]
pub enum Reply {
    /// Pre-encoded JSON body, sent with 200.
    Json(Bytes),
    /// Redirect with an empty body.
    Redirect {
        location: String,
        status: StatusCode,
    },
    /// The reply value could not be encoded; rendered as a fixed 500.
    EncodeFailed(serde_json::Error),
}

impl Reply {
    /// Encode `value` as JSON.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Reply::Json(Bytes::from(body)),
            Err(e) => Reply::EncodeFailed(e),
        }
    }

    /// `{}`
    pub fn empty_object() -> Self {
        Reply::Json(Bytes::from_static(b"{}"))
    }

    /// 301 Moved Permanently to `location`.
    pub fn redirect(location: impl Into<String>) -> Self {
        Reply::Redirect {
            location: location.into(),
            status: StatusCode::MOVED_PERMANENTLY,
        }
    }
}
