use async_trait::async_trait;
use neo4rs::{ConfigBuilder, Graph, Query, Row};
use perms_core::{BackendError, BackendResult, Filter, PermissionBackend, Triple};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use crate::{cypher, Neo4jConfig};

const BACKEND: &str = "neo4j";

fn query_error(e: neo4rs::Error) -> BackendError {
    BackendError::query(BACKEND, e)
}

fn uuid_column(row: &Row, column: &str) -> BackendResult<uuid::Uuid> {
    let value: String = row
        .get(column)
        .map_err(|e| BackendError::mapping(BACKEND, format!("{} is missing: {}", column, e)))?;
    cypher::parse_uuid(&value)
        .ok_or_else(|| BackendError::mapping(BACKEND, format!("{} is not a UUID: {}", column, value)))
}

fn row_to_triple(row: &Row) -> BackendResult<Triple> {
    let predicate: String = row
        .get("predicate")
        .map_err(|e| BackendError::mapping(BACKEND, format!("predicate is missing: {}", e)))?;

    Ok(Triple::new(
        uuid_column(row, "subject_uuid")?,
        predicate,
        uuid_column(row, "object_uuid")?,
    ))
}

/// Neo4j backed permission store.
///
/// The graph handle is connected on first use and the indexes are created
/// right after; both happen once per backend.
pub struct Neo4jBackend {
    config: Neo4jConfig,
    graph: OnceCell<Arc<Graph>>,
    indexes_ready: OnceCell<()>,
}

impl std::fmt::Debug for Neo4jBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Neo4jBackend")
            .field("uri", &self.config.uri)
            .field("database", &self.config.database)
            .field("connected", &self.graph.initialized())
            .finish()
    }
}

impl Neo4jBackend {
    /// Create a backend from config. No connection is made until first use.
    pub fn new(config: Neo4jConfig) -> BackendResult<Self> {
        if config.batch_size == 0 {
            return Err(BackendError::Configuration(
                "neo4j batch_size must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            config,
            graph: OnceCell::new(),
            indexes_ready: OnceCell::new(),
        })
    }

    async fn connect(&self) -> BackendResult<Arc<Graph>> {
        let mut builder = ConfigBuilder::default()
            .uri(&self.config.uri)
            .user(&self.config.user)
            .password(&self.config.password);

        if let Some(db) = &self.config.database {
            builder = builder.db(db.as_str());
        }

        let config = builder
            .build()
            .map_err(|e| BackendError::Configuration(format!("Failed to build Neo4j config: {}", e)))?;

        let graph = Graph::connect(config)
            .await
            .map_err(|e| BackendError::connection(BACKEND, e))?;
        info!(uri = %self.config.uri, "Connected to Neo4j");

        Ok(Arc::new(graph))
    }

    /// Graph handle with the indexes guaranteed to exist
    async fn graph(&self) -> BackendResult<&Graph> {
        let graph = self.graph.get_or_try_init(|| self.connect()).await?;

        self.indexes_ready
            .get_or_try_init(|| Self::ensure_indexes(graph))
            .await?;

        Ok(graph.as_ref())
    }

    async fn ensure_indexes(graph: &Graph) -> BackendResult<()> {
        for statement in cypher::INDEX_STATEMENTS {
            graph
                .run(Query::new(statement.to_string()))
                .await
                .map_err(query_error)?;
        }
        info!("Neo4j indexes ready");
        Ok(())
    }

    async fn collect(graph: &Graph, query: Query) -> BackendResult<HashSet<Triple>> {
        let mut stream = graph.execute(query).await.map_err(query_error)?;

        let mut triples = HashSet::new();
        while let Some(row) = stream.next().await.map_err(query_error)? {
            triples.insert(row_to_triple(&row)?);
        }
        Ok(triples)
    }
}

#[async_trait]
impl PermissionBackend for Neo4jBackend {
    fn name(&self) -> &'static str {
        BACKEND
    }

    #[instrument(skip(self, triples), fields(backend = BACKEND, count = triples.len()))]
    async fn create(&self, triples: &[Triple]) -> BackendResult<HashSet<Triple>> {
        let created: HashSet<Triple> = triples.iter().cloned().collect();
        if created.is_empty() {
            return Ok(created);
        }

        let graph = self.graph().await?;
        let unique: Vec<Triple> = created.iter().cloned().collect();
        for batch in unique.chunks(self.config.batch_size) {
            graph
                .run(cypher::create_query(batch))
                .await
                .map_err(query_error)?;
            debug!(batch = batch.len(), "Merged triples");
        }

        Ok(created)
    }

    #[instrument(skip(self, filter), fields(backend = BACKEND))]
    async fn read(&self, filter: &Filter) -> BackendResult<HashSet<Triple>> {
        let graph = self.graph().await?;
        let results = Self::collect(graph, cypher::read_query(filter)).await?;

        debug!(matched = results.len(), "Matched relationships");
        Ok(results)
    }

    #[instrument(skip(self, filter), fields(backend = BACKEND))]
    async fn delete(&self, filter: &Filter) -> BackendResult<HashSet<Triple>> {
        let graph = self.graph().await?;
        let deleted = Self::collect(graph, cypher::delete_query(filter)).await?;

        debug!(deleted = deleted.len(), "Deleted relationships");
        Ok(deleted)
    }

    async fn health_check(&self) -> BackendResult<bool> {
        let graph = self.graph.get_or_try_init(|| self.connect()).await?;
        graph
            .run(Query::new("RETURN 1".to_string()))
            .await
            .map_err(query_error)?;
        Ok(true)
    }
}
