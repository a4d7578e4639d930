use async_trait::async_trait;
use perms_core::{BackendError, BackendResult, Filter, PermissionBackend, Triple};
use sqlx::PgPool;
use std::collections::HashSet;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::connection::connect_with_retry;
use crate::{query, schema, PostgresConfig};

const BACKEND: &str = "postgres";

type Row = (Uuid, String, Uuid);

fn query_error(e: sqlx::Error) -> BackendError {
    BackendError::query(BACKEND, e)
}

fn into_triples(rows: Vec<Row>) -> HashSet<Triple> {
    rows.into_iter()
        .map(|(subject, predicate, object)| Triple::new(subject, predicate, object))
        .collect()
}

/// PostgreSQL backed permission store.
///
/// The pool is opened on first use and the schema is provisioned right after;
/// both transitions happen once per backend and are never undone.
#[derive(Debug)]
pub struct PostgresBackend {
    config: PostgresConfig,
    pool: OnceCell<PgPool>,
    schema_ready: OnceCell<()>,
}

impl PostgresBackend {
    /// Create a backend from config. No connection is made until first use.
    pub fn new(config: PostgresConfig) -> Self {
        Self {
            config,
            pool: OnceCell::new(),
            schema_ready: OnceCell::new(),
        }
    }

    /// Pool with the schema guaranteed to exist
    async fn pool(&self) -> BackendResult<&PgPool> {
        let pool = self
            .pool
            .get_or_try_init(|| connect_with_retry(&self.config))
            .await?;

        self.schema_ready
            .get_or_try_init(|| Self::ensure_schema(pool))
            .await?;

        Ok(pool)
    }

    async fn ensure_schema(pool: &PgPool) -> BackendResult<()> {
        for (name, sql) in schema::statements() {
            debug!(statement = name, "Applying schema statement");
            sqlx::query(sql).execute(pool).await.map_err(query_error)?;
        }
        info!(table = schema::TABLE, "PostgreSQL schema ready");
        Ok(())
    }
}

#[async_trait]
impl PermissionBackend for PostgresBackend {
    fn name(&self) -> &'static str {
        BACKEND
    }

    #[instrument(skip(self, triples), fields(backend = BACKEND, count = triples.len()))]
    async fn create(&self, triples: &[Triple]) -> BackendResult<HashSet<Triple>> {
        let created: HashSet<Triple> = triples.iter().cloned().collect();
        if created.is_empty() {
            return Ok(created);
        }

        let pool = self.pool().await?;
        let rows: Vec<&Triple> = created.iter().collect();
        for chunk in rows.chunks(query::INSERT_CHUNK) {
            let result = query::insert(chunk.iter().copied())
                .build()
                .execute(pool)
                .await
                .map_err(query_error)?;
            debug!(
                batch = chunk.len(),
                inserted = result.rows_affected(),
                "Inserted triples"
            );
        }

        Ok(created)
    }

    #[instrument(skip(self, filter), fields(backend = BACKEND))]
    async fn read(&self, filter: &Filter) -> BackendResult<HashSet<Triple>> {
        let pool = self.pool().await?;
        let rows: Vec<Row> = query::select(filter)
            .build_query_as()
            .fetch_all(pool)
            .await
            .map_err(query_error)?;

        debug!(rows = rows.len(), "Selected triples");
        Ok(into_triples(rows))
    }

    #[instrument(skip(self, filter), fields(backend = BACKEND))]
    async fn delete(&self, filter: &Filter) -> BackendResult<HashSet<Triple>> {
        let pool = self.pool().await?;
        let rows: Vec<Row> = query::delete(filter)
            .build_query_as()
            .fetch_all(pool)
            .await
            .map_err(query_error)?;

        debug!(rows = rows.len(), "Deleted triples");
        Ok(into_triples(rows))
    }

    async fn health_check(&self) -> BackendResult<bool> {
        let pool = self.pool().await?;
        sqlx::query("SELECT 1")
            .execute(pool)
            .await
            .map_err(query_error)?;
        Ok(true)
    }
}
