use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::error::{Error as MongoError, ErrorKind};
use mongodb::options::{ClientOptions, Credential, IndexOptions, InsertManyOptions};
use mongodb::{Client, Collection, IndexModel};
use perms_core::{BackendError, BackendResult, Filter, PermissionBackend, Triple};
use std::collections::HashSet;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use crate::document::{filter_document, PermDocument};
use crate::MongoConfig;

const BACKEND: &str = "mongodb";

/// Server error code for a unique index violation
const DUPLICATE_KEY: i32 = 11000;

fn query_error(e: MongoError) -> BackendError {
    BackendError::query(BACKEND, e)
}

/// True when every failed write in a bulk insert collided with an existing
/// document, i.e. the triples were already stored.
fn only_duplicates(error: &MongoError) -> bool {
    match error.kind.as_ref() {
        ErrorKind::BulkWrite(failure) => {
            failure.write_concern_error.is_none()
                && failure
                    .write_errors
                    .as_ref()
                    .map_or(false, |errors| errors.iter().all(|e| e.code == DUPLICATE_KEY))
        }
        _ => false,
    }
}

/// MongoDB backed permission store.
///
/// The client is built on first use and the indexes are created right after;
/// both happen once per backend.
#[derive(Debug)]
pub struct MongoBackend {
    config: MongoConfig,
    client: OnceCell<Client>,
    indexes_ready: OnceCell<()>,
}

impl MongoBackend {
    /// Create a backend from config. No connection is made until first use.
    pub fn new(config: MongoConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
            indexes_ready: OnceCell::new(),
        }
    }

    async fn connect(&self) -> BackendResult<Client> {
        let mut options = ClientOptions::parse(format!("mongodb://{}", self.config.host))
            .await
            .map_err(|e| BackendError::Configuration(format!("invalid MongoDB host: {}", e)))?;

        // Credentials go through the options, so they never need URL encoding
        if !self.config.user.is_empty() {
            let mut credential = Credential::default();
            credential.username = Some(self.config.user.clone());
            credential.password = Some(self.config.password.clone());
            options.credential = Some(credential);
        }
        options.app_name = Some("perms".to_string());

        let client = Client::with_options(options).map_err(|e| BackendError::connection(BACKEND, e))?;
        info!(host = %self.config.host, database = %self.config.database, "MongoDB client ready");
        Ok(client)
    }

    /// Collection handle with the indexes guaranteed to exist
    async fn collection(&self) -> BackendResult<Collection<PermDocument>> {
        let client = self.client.get_or_try_init(|| self.connect()).await?;
        let collection = client
            .database(&self.config.database)
            .collection::<PermDocument>(&self.config.collection);

        self.indexes_ready
            .get_or_try_init(|| Self::ensure_indexes(&collection))
            .await?;

        Ok(collection)
    }

    async fn ensure_indexes(collection: &Collection<PermDocument>) -> BackendResult<()> {
        let models = vec![
            IndexModel::builder().keys(doc! { "subject_uuid": 1 }).build(),
            IndexModel::builder().keys(doc! { "object_uuid": 1 }).build(),
            IndexModel::builder()
                .keys(doc! { "subject_uuid": 1, "predicate": 1, "object_uuid": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
        ];

        collection
            .create_indexes(models, None)
            .await
            .map_err(query_error)?;
        info!(collection = %collection.name(), "MongoDB indexes ready");
        Ok(())
    }

    async fn find(
        collection: &Collection<PermDocument>,
        filter: &Filter,
    ) -> BackendResult<Vec<PermDocument>> {
        collection
            .find(filter_document(filter), None)
            .await
            .map_err(query_error)?
            .try_collect()
            .await
            .map_err(query_error)
    }
}

#[async_trait]
impl PermissionBackend for MongoBackend {
    fn name(&self) -> &'static str {
        BACKEND
    }

    #[instrument(skip(self, triples), fields(backend = BACKEND, count = triples.len()))]
    async fn create(&self, triples: &[Triple]) -> BackendResult<HashSet<Triple>> {
        let created: HashSet<Triple> = triples.iter().cloned().collect();
        if created.is_empty() {
            return Ok(created);
        }

        let collection = self.collection().await?;
        let documents: Vec<PermDocument> = created.iter().map(PermDocument::from).collect();
        // Unordered, so one duplicate does not stop the rest of the batch
        let options = InsertManyOptions::builder().ordered(false).build();

        match collection.insert_many(documents, options).await {
            Ok(result) => debug!(inserted = result.inserted_ids.len(), "Inserted documents"),
            Err(e) if only_duplicates(&e) => debug!("Some triples were already stored"),
            Err(e) => return Err(query_error(e)),
        }

        Ok(created)
    }

    #[instrument(skip(self, filter), fields(backend = BACKEND))]
    async fn read(&self, filter: &Filter) -> BackendResult<HashSet<Triple>> {
        let collection = self.collection().await?;
        let documents = Self::find(&collection, filter).await?;

        debug!(documents = documents.len(), "Found documents");
        Ok(documents.into_iter().map(Triple::from).collect())
    }

    /// Find first so the removed triples are known, then delete by `_id`
    #[instrument(skip(self, filter), fields(backend = BACKEND))]
    async fn delete(&self, filter: &Filter) -> BackendResult<HashSet<Triple>> {
        let collection = self.collection().await?;
        let documents = Self::find(&collection, filter).await?;
        if documents.is_empty() {
            return Ok(HashSet::new());
        }

        let ids: Vec<ObjectId> = documents.iter().filter_map(|d| d.id).collect();
        let result = collection
            .delete_many(doc! { "_id": { "$in": ids } }, None)
            .await
            .map_err(query_error)?;

        debug!(deleted = result.deleted_count, "Deleted documents");
        Ok(documents.into_iter().map(Triple::from).collect())
    }

    async fn health_check(&self) -> BackendResult<bool> {
        let client = self.client.get_or_try_init(|| self.connect()).await?;
        client
            .database(&self.config.database)
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(query_error)?;
        Ok(true)
    }
}
