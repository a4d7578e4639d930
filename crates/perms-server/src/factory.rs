//! Backend selection.
//!
//! The configured identifier is parsed into a [`BackendKind`] and matched to a
//! constructor. Adapters that were compiled out are a configuration error.

use perms_core::{InMemoryBackend, PermissionBackend};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};

/// Every storage backend the server knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Memory,
    Redis,
    Postgres,
    MongoDb,
    Neo4j,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Memory => "memory",
            BackendKind::Redis => "redis",
            BackendKind::Postgres => "postgres",
            BackendKind::MongoDb => "mongodb",
            BackendKind::Neo4j => "neo4j",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ServerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "in_memory" | "inmemory" => Ok(BackendKind::Memory),
            "redis" => Ok(BackendKind::Redis),
            "postgres" | "postgresql" => Ok(BackendKind::Postgres),
            "mongodb" | "mongo" => Ok(BackendKind::MongoDb),
            "neo4j" => Ok(BackendKind::Neo4j),
            other => Err(ServerError::ConfigError(format!(
                "Unknown backend '{}', expected one of memory, redis, postgres, mongodb, neo4j",
                other
            ))),
        }
    }
}

/// Construct the backend selected by `config.backend`.
///
/// Network backends connect lazily, so this succeeds even when the store is
/// not reachable yet.
pub fn create_backend(config: &ServerConfig) -> ServerResult<Arc<dyn PermissionBackend>> {
    info!(backend = %config.backend, "Creating permission backend");

    let backend: Arc<dyn PermissionBackend> = match config.backend {
        BackendKind::Memory => Arc::new(InMemoryBackend::new()),

        #[cfg(feature = "redis")]
        BackendKind::Redis => Arc::new(perms_redis::RedisBackend::new(&config.redis)?),

        #[cfg(feature = "postgres")]
        BackendKind::Postgres => Arc::new(perms_postgres::PostgresBackend::new(config.postgres.clone())),

        #[cfg(feature = "mongodb")]
        BackendKind::MongoDb => Arc::new(perms_mongodb::MongoBackend::new(config.mongodb.clone())),

        #[cfg(feature = "neo4j")]
        BackendKind::Neo4j => Arc::new(perms_neo4j::Neo4jBackend::new(config.neo4j.clone())?),

        #[allow(unreachable_patterns)]
        kind => {
            return Err(ServerError::ConfigError(format!(
                "Backend '{}' is not enabled in this build",
                kind
            )))
        }
    };

    Ok(backend)
}
