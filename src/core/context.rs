//! Application and request contexts.
//!
//! ```text
//! ApplicationContext (startup, immutable values, root token)
//!     ├─ RequestContext #1 (child token, cancelled at dispatch exit)
//!     ├─ RequestContext #2
//!     └─ ...
//! ```
//!
//! Values are stored under typed keys: each value gets its own marker type
//! implementing [`ContextKey`], so two collaborators can never shadow each
//! other by picking the same string.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::{CancellationToken, DropGuard};

/// Typed key for a context value.
///
/// ```rust,ignore
/// struct DatabaseKey;
///
/// impl ContextKey for DatabaseKey {
///     type Value = Arc<dyn LinkStore>;
/// }
/// ```
pub trait ContextKey: 'static {
    /// Type of the value stored under this key.
    type Value: Send + Sync + 'static;
}

type ValueMap = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// Long-lived root context, built once at startup.
///
/// Cloning is cheap: values are shared behind an `Arc` and the token is a
/// handle to the same cancellation tree.
#[derive(Clone)]
pub struct ApplicationContext {
    values: Arc<ValueMap>,
    token: CancellationToken,
}

impl ApplicationContext {
    /// Create an empty root context.
    pub fn new() -> Self {
        Self {
            values: Arc::new(HashMap::new()),
            token: CancellationToken::new(),
        }
    }

    /// Store a value under `K`, replacing any previous value.
    ///
    /// Intended for startup wiring; values are read-only once requests flow.
    pub fn with_value<K: ContextKey>(mut self, value: K::Value) -> Self {
        Arc::make_mut(&mut self.values).insert(TypeId::of::<K>(), Arc::new(value));
        self
    }

    /// Get the value stored under `K`.
    pub fn value<K: ContextKey>(&self) -> Option<&K::Value> {
        self.values
            .get(&TypeId::of::<K>())
            .and_then(|v| v.downcast_ref::<K::Value>())
    }

    /// Check whether a value is stored under `K`.
    pub fn contains<K: ContextKey>(&self) -> bool {
        self.value::<K>().is_some()
    }

    /// Root cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Cancel the root context and every request derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the root context has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Derive a request context with its own child token.
    pub fn derive(&self, request_id: impl Into<String>) -> RequestContext {
        RequestContext {
            app: self.clone(),
            token: self.token.child_token(),
            request_id: request_id.into(),
            started_at: Instant::now(),
        }
    }
}

impl Default for ApplicationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ApplicationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationContext")
            .field("values", &self.values.len())
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

/// Per-request context.
///
/// Exposes the application values plus a cancellation token that fires when
/// the request finishes, the client goes away, or the application shuts down.
#[derive(Clone)]
pub struct RequestContext {
    app: ApplicationContext,
    token: CancellationToken,
    /// Request ID for log correlation.
    pub request_id: String,
    /// Dispatch start time.
    pub started_at: Instant,
}

impl RequestContext {
    /// Context not bound to any application (requests built outside dispatch).
    pub fn detached() -> Self {
        ApplicationContext::new().derive(String::new())
    }

    /// Get an application value stored under `K`.
    #[inline]
    pub fn value<K: ContextKey>(&self) -> Option<&K::Value> {
        self.app.value::<K>()
    }

    /// The application context this request was derived from.
    #[inline]
    pub fn application(&self) -> &ApplicationContext {
        &self.app
    }

    /// Request cancellation token.
    #[inline]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the request is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Guard that cancels this context when dropped.
    pub fn cancel_on_drop(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }

    /// Get elapsed time since dispatch started.
    #[inline]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Get elapsed time in milliseconds.
    #[inline]
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1000.0
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

/// Generate a request ID (UUID v4, hyphenated).
pub fn generate_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
