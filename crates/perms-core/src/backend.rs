//! The storage backend contract

use async_trait::async_trait;
use std::collections::HashSet;

use crate::{BackendResult, Filter, Triple};

/// Trait every permission storage adapter implements.
///
/// All adapters must produce the same observable results for the same
/// sequence of calls; only cost and atomicity differ with the store.
#[async_trait]
pub trait PermissionBackend: Send + Sync + std::fmt::Debug {
    /// Short identifier used in logs and errors
    fn name(&self) -> &'static str;

    /// Persist every input triple and return the set now guaranteed present.
    ///
    /// Creating a triple that already exists is a no-op on storage and still
    /// reports it as created. Structurally identical inputs are collapsed.
    async fn create(&self, triples: &[Triple]) -> BackendResult<HashSet<Triple>>;

    /// Every stored triple matching `filter`. An empty filter returns everything.
    async fn read(&self, filter: &Filter) -> BackendResult<HashSet<Triple>>;

    /// Remove every stored triple matching `filter` and return exactly those
    /// removed. An empty filter removes everything.
    async fn delete(&self, filter: &Filter) -> BackendResult<HashSet<Triple>>;

    /// Health check
    async fn health_check(&self) -> BackendResult<bool> {
        Ok(true)
    }
}
