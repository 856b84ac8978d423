//! Ordered pre-processor chain.

use std::sync::Arc;

use super::PreProcessor;
use crate::core::{Request, Result};

/// Ordered list of pre-processors, shared between handlers without locks.
///
/// Cloning is cheap and yields a snapshot: [`push`](Self::push) on one clone
/// copies the list if it is shared, so other clones never observe the
/// appended entry.
#[derive(Clone, Default)]
pub struct PreProcessorChain {
    processors: Arc<Vec<Arc<dyn PreProcessor>>>,
}

impl PreProcessorChain {
    /// Create a new empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pre-processor. First pushed runs first.
    pub fn push(&mut self, processor: Arc<dyn PreProcessor>) {
        Arc::make_mut(&mut self.processors).push(processor);
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Pre-processor names in execution order.
    pub fn names(&self) -> Vec<&'static str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    /// Run every pre-processor in order, stopping at the first error.
    pub async fn run(&self, req: &mut Request) -> Result<()> {
        for processor in self.processors.iter() {
            if let Err(err) = processor.before(req).await {
                tracing::debug!(
                    pre_processor = processor.name(),
                    status = err.status().as_u16(),
                    request_id = %req.context().request_id,
                    "pre-processor short-circuited request"
                );
                return Err(err);
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for PreProcessorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
