//! Neo4j implementation of the perms backend contract
//!
//! Every subject and object UUID is a `NODE`; a triple is a directed
//! `PREDICATE` relationship from subject to object carrying the predicate as
//! a property. Nodes are never removed, only relationships.

mod backend;
pub mod cypher;

use serde::{Deserialize, Serialize};

pub use backend::Neo4jBackend;

/// Configuration for Neo4j connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neo4jConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: Option<String>,

    /// Triples merged per round trip by `create`
    pub batch_size: usize,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: "neo4j://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: "password".to_string(),
            database: None,
            batch_size: 100,
        }
    }
}

impl Neo4jConfig {
    /// Config for a host name, using the default bolt port
    pub fn for_host(host: &str) -> Self {
        Self {
            uri: format!("neo4j://{}:7687", host),
            ..Self::default()
        }
    }
}
