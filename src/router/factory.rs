//! Handler factory: binds context and the shared pre-processor chain.

use std::fmt;
use std::sync::Arc;

use super::{Handler, PreProcessor, PreProcessorChain, RouteHandler};
use crate::config::Config;
use crate::core::{ApplicationContext, ContextKey};

/// Context key for the loaded [`Config`].
pub struct ConfigKey;

impl ContextKey for ConfigKey {
    type Value = Config;
}

/// Startup wiring failure.
#[derive(Debug)]
pub enum WiringError {
    /// The application context does not carry a configuration value.
    ConfigurationType,
}

impl fmt::Display for WiringError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WiringError::ConfigurationType => {
                write!(f, "application context does not carry a configuration value")
            }
        }
    }
}

impl std::error::Error for WiringError {}

/// Produces dispatch-ready [`Handler`]s sharing one context and one chain.
pub struct HandlerFactory {
    context: ApplicationContext,
    chain: PreProcessorChain,
    echo_body: bool,
}

impl HandlerFactory {
    /// Create a factory with an empty chain.
    ///
    /// Fails unless `context` carries a value under [`ConfigKey`].
    pub fn new(context: ApplicationContext) -> Result<Self, WiringError> {
        let echo_body = context
            .value::<ConfigKey>()
            .ok_or(WiringError::ConfigurationType)?
            .application
            .echo_error_body();

        Ok(Self {
            context,
            chain: PreProcessorChain::new(),
            echo_body,
        })
    }

    /// Append a pre-processor to the shared chain.
    ///
    /// Handlers created earlier keep the chain they were created with.
    pub fn before_handler<P: PreProcessor + 'static>(mut self, processor: P) -> Self {
        self.chain.push(Arc::new(processor));
        self
    }

    /// Bind `route` to this factory's context and a snapshot of its chain.
    pub fn new_handler<R: RouteHandler + 'static>(&self, route: R) -> Handler {
        Handler::new(
            self.context.clone(),
            self.chain.clone(),
            Arc::new(route),
            self.echo_body,
        )
    }

    pub fn context(&self) -> &ApplicationContext {
        &self.context
    }

    /// Pre-processor names in execution order.
    pub fn chain_names(&self) -> Vec<&'static str> {
        self.chain.names()
    }
}

impl fmt::Debug for HandlerFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerFactory")
            .field("chain", &self.chain)
            .field("echo_body", &self.echo_body)
            .finish()
    }
}
