//! In-memory implementation of PermissionBackend
//!
//! This implementation is primarily intended for testing and development
//! purposes. Every call is a linear scan; nothing is indexed and all data is
//! lost when the last handle is dropped.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{BackendResult, Filter, PermissionBackend, Triple};

/// In-memory triple store
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    triples: Arc<RwLock<HashSet<Triple>>>,
}

impl InMemoryBackend {
    /// Create an empty in-memory backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend seeded with `initial` triples
    pub fn with_triples(initial: impl IntoIterator<Item = Triple>) -> Self {
        Self {
            triples: Arc::new(RwLock::new(initial.into_iter().collect())),
        }
    }

    /// Number of stored triples
    pub async fn len(&self) -> usize {
        self.triples.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.triples.read().await.is_empty()
    }
}

#[async_trait]
impl PermissionBackend for InMemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn create(&self, triples: &[Triple]) -> BackendResult<HashSet<Triple>> {
        let created: HashSet<Triple> = triples.iter().cloned().collect();

        let mut store = self.triples.write().await;
        store.extend(created.iter().cloned());
        debug!(created = created.len(), stored = store.len(), "memory create");

        Ok(created)
    }

    async fn read(&self, filter: &Filter) -> BackendResult<HashSet<Triple>> {
        let store = self.triples.read().await;
        Ok(store.iter().filter(|t| filter.matches(t)).cloned().collect())
    }

    async fn delete(&self, filter: &Filter) -> BackendResult<HashSet<Triple>> {
        let mut store = self.triples.write().await;

        let deleted: HashSet<Triple> = store.iter().filter(|t| filter.matches(t)).cloned().collect();
        store.retain(|t| !deleted.contains(t));
        debug!(deleted = deleted.len(), stored = store.len(), "memory delete");

        Ok(deleted)
    }
}
