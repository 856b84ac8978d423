//! In-process link store.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Link, LinkStore, StoreError};

/// Link store kept in memory, in insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    links: RwLock<Vec<Link>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `links`.
    pub fn with_links(links: impl IntoIterator<Item = Link>) -> Self {
        Self {
            links: RwLock::new(links.into_iter().collect()),
        }
    }
}

#[async_trait]
impl LinkStore for MemoryStore {
    async fn find(&self, key: &str) -> Result<Option<Link>, StoreError> {
        let links = self.links.read().await;
        Ok(links.iter().find(|l| l.key == key).cloned())
    }

    async fn list(&self, limit: Option<usize>, offset: usize) -> Result<Vec<Link>, StoreError> {
        let links = self.links.read().await;
        let iter = links.iter().skip(offset).cloned();
        Ok(match limit {
            Some(n) => iter.take(n).collect(),
            None => iter.collect(),
        })
    }

    async fn insert(&self, link: Link) -> Result<(), StoreError> {
        let mut links = self.links.write().await;
        if links.iter().any(|l| l.key == link.key) {
            return Err(StoreError::Duplicate(link.key));
        }
        links.push(link);
        Ok(())
    }
}
