//! Core types for HTTP request/response handling.
//!
//! This module provides the fundamental types used throughout the dispatch
//! pipeline and route logic:
//!
//! - [`Request`] - buffered HTTP request carrying its [`RequestContext`]
//! - [`Response`] - HTTP response with builder pattern
//! - [`ApplicationContext`] / [`RequestContext`] - typed values and cancellation
//! - [`HttpError`] - structured error mapped onto an HTTP response
//!
//! # Example
//!
//! ```rust,ignore
//! use golinks::core::{HttpError, Request};
//!
//! fn require_key(req: &Request) -> Result<String, HttpError> {
//!     req.query_param("key")
//!         .filter(|k| !k.is_empty())
//!         .ok_or_else(|| HttpError::not_found("requires key"))
//! }
//! ```

mod context;
mod error;
mod request;
mod response;

pub use context::{generate_request_id, ApplicationContext, ContextKey, RequestContext};
pub use error::{Cause, HttpError, Result};
pub use request::Request;
pub use response::{Response, ResponseBuilder};
