//! Path to handler table.

use std::collections::HashMap;

use super::Handler;
use crate::core::{HttpError, Request, Response};

/// Exact-path route table with a fallback handler.
///
/// Built once at startup and shared read-only afterwards. Requests whose path
/// matches no registered route go to the fallback, which answers
/// `404 {"httpError":"Page not found"}` unless replaced.
#[derive(Clone, Debug, Default)]
pub struct Router {
    routes: HashMap<String, Handler>,
    fallback: Option<Handler>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `path` to `handler`, replacing any previous binding.
    pub fn route(mut self, path: impl Into<String>, handler: Handler) -> Self {
        self.routes.insert(path.into(), handler);
        self
    }

    /// Handler for unmatched paths.
    pub fn fallback(mut self, handler: Handler) -> Self {
        self.fallback = Some(handler);
        self
    }

    /// Registered paths, sorted.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    /// Dispatch a request to its handler.
    pub async fn dispatch(&self, req: Request) -> Response {
        match self.routes.get(req.path()).or(self.fallback.as_ref()) {
            Some(handler) => handler.serve(req).await,
            None => {
                tracing::debug!(path = req.path(), "no route and no fallback");
                super::render_error(&HttpError::not_found("Page not found"), false)
            }
        }
    }
}
