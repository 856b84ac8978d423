//! golinks - short-link redirect service.
//!
//! Stores `key → URL` pairs and answers `GET /go?key=<k>` with a permanent
//! redirect. Links are listed and created over a small JSON API guarded by
//! HTTP Basic credentials.
//!
//! # Architecture
//!
//! ```text
//! hyper connection → server (body limit) → Router
//!     → Handler: request id, RequestContext, panic boundary
//!         → PreProcessorChain (allow_methods, basic_auth, ...)
//!         → RouteHandler (GoRoute / LinksRoute) → LinkStore
//!     → envelope (JSON + security headers) → access log
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use golinks::config::Config;
//! use golinks::core::ApplicationContext;
//! use golinks::router::ConfigKey;
//! use golinks::server::Server;
//!
//! let config = Config::load("settings/development.yml")?;
//! let store = Arc::new(SqliteStore::new(golinks::database::open(&config.database)?));
//! let context = ApplicationContext::new().with_value::<ConfigKey>(config.clone());
//! let router = golinks::routes::build_router(context.clone(), store)?;
//! Server::bind(&config.server, router, context).await?.run().await?;
//! ```

/// Package version from Cargo.toml
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git commit hash (8 chars), empty outside a git checkout
pub const BUILD_VERSION: &str = env!("BUILD_VERSION");

/// Full version string: "0.1.0 (abc12345)"
pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_VERSION"), ")");

pub mod config;
pub mod core;
pub mod database;
pub mod logging;
pub mod migration;
pub mod router;
pub mod routes;
pub mod server;
pub mod store;

// Re-exports for convenience
pub use config::Config;
pub use server::Server;
