//! Integration tests for golinks
//!
//! Each test boots the server in-process on an ephemeral port and drives it
//! over HTTP with reqwest (redirects disabled).
//!
//! Run with: cargo test --test integration

mod helpers;

mod links;
mod pipeline;
mod persistence;
