//! Route wiring for the link service.
//!
//! ```text
//! /go     GET            → GoRoute     (allow_methods)
//! /links  GET, POST      → LinksRoute  (allow_methods, basic_auth on POST)
//! *                      → 404 "Page not found"
//! ```

mod guards;
mod links;

use std::sync::Arc;

use http::Method;

use crate::core::{ApplicationContext, HttpError, Request, Result};
use crate::router::{HandlerFactory, Reply, Router, WiringError};
use crate::store::LinkStore;

pub use guards::{AllowMethods, BasicAuth};
pub use links::{GoRoute, LinksRoute};

async fn page_not_found(_req: Request) -> Result<Reply> {
    Err(HttpError::not_found("Page not found"))
}

/// Build the router for the link service.
///
/// Fails if `context` carries no configuration.
pub fn build_router(
    context: ApplicationContext,
    store: Arc<dyn LinkStore>,
) -> std::result::Result<Router, WiringError> {
    let factory = HandlerFactory::new(context)?;

    let go = factory
        .new_handler(GoRoute::new(store.clone()))
        .before_handler(AllowMethods::new([Method::GET]));

    let links = factory
        .new_handler(LinksRoute::new(store))
        .before_handler(AllowMethods::new([Method::GET, Method::POST]))
        .before_handler(BasicAuth::on([Method::POST]));

    Ok(Router::new()
        .route("/go", go)
        .route("/links", links)
        .fallback(factory.new_handler(page_not_found)))
}
