//! Per-object permission storage core
//!
//! A permission is a `(subject, predicate, object)` triple meaning "subject may
//! perform predicate on object". This crate defines the triple and filter value
//! types, the [`PermissionBackend`] contract every storage adapter implements,
//! and a reference in-memory adapter. The network-backed adapters live in
//! their own crates and depend only on this one.

pub mod backend;
pub mod error;
pub mod memory;
pub mod triple;

pub use backend::PermissionBackend;
pub use error::{BackendError, BackendResult};
pub use memory::InMemoryBackend;
pub use triple::{Filter, Triple};
