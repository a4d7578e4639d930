use async_trait::async_trait;
use perms_core::{BackendError, BackendResult, Filter, PermissionBackend, Triple};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, AsyncIter, Client, RedisError};
use std::collections::HashSet;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{key, RedisConfig};

const BACKEND: &str = "redis";

fn query_error(e: RedisError) -> BackendError {
    BackendError::query(BACKEND, e)
}

/// A pair key that survived the subject/object part of a filter
struct PairKey {
    key: String,
    subject: Uuid,
    object: Uuid,
}

impl PairKey {
    fn triple(&self, predicate: impl Into<String>) -> Triple {
        Triple::new(self.subject, predicate, self.object)
    }
}

/// Redis backed permission store.
///
/// The connection manager is created on first use and reused for the life of
/// the backend; it reconnects by itself if the server drops the connection.
pub struct RedisBackend {
    client: Client,
    key_prefix: String,
    connection: OnceCell<ConnectionManager>,
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("key_prefix", &self.key_prefix)
            .field("connected", &self.connection.initialized())
            .finish()
    }
}

impl RedisBackend {
    /// Create a backend from config. No connection is made until first use.
    pub fn new(config: &RedisConfig) -> BackendResult<Self> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| BackendError::Configuration(format!("invalid Redis URL: {}", e)))?;

        Ok(Self {
            client,
            key_prefix: config.key_prefix.clone(),
            connection: OnceCell::new(),
        })
    }

    async fn connection(&self) -> BackendResult<ConnectionManager> {
        let manager = self
            .connection
            .get_or_try_init(|| async {
                let manager = ConnectionManager::new(self.client.clone())
                    .await
                    .map_err(|e| BackendError::connection(BACKEND, e))?;
                info!(prefix = %self.key_prefix, "Connected to Redis");
                Ok::<_, BackendError>(manager)
            })
            .await?;

        Ok(manager.clone())
    }

    /// Every pair key under the prefix whose subject and object pass `filter`.
    ///
    /// Cost is proportional to the number of stored pairs, whatever the filter.
    async fn matching_keys(
        &self,
        conn: &mut ConnectionManager,
        filter: &Filter,
    ) -> BackendResult<Vec<PairKey>> {
        let mut raw_keys = HashSet::new();
        {
            let mut iter: AsyncIter<String> = conn
                .scan_match(key::pattern(&self.key_prefix))
                .await
                .map_err(query_error)?;
            // SCAN may report a key more than once
            while let Some(raw) = iter.next_item().await {
                raw_keys.insert(raw);
            }
        }

        let mut keys = Vec::new();
        for raw in raw_keys {
            match key::decode(&self.key_prefix, &raw) {
                Some((subject, object)) => {
                    if filter.admits_subject(&subject) && filter.admits_object(&object) {
                        keys.push(PairKey { key: raw, subject, object });
                    }
                }
                None => warn!(key = %raw, "Skipping malformed key in perms namespace"),
            }
        }

        debug!(matching = keys.len(), "Scanned pair keys");
        Ok(keys)
    }

    /// Predicates from the filter, in a stable order so pipeline replies can
    /// be zipped back onto their requests.
    fn requested_predicates(filter: &Filter) -> Vec<&str> {
        let mut predicates: Vec<&str> = filter.predicates.iter().map(String::as_str).collect();
        predicates.sort_unstable();
        predicates
    }
}

#[async_trait]
impl PermissionBackend for RedisBackend {
    fn name(&self) -> &'static str {
        BACKEND
    }

    #[instrument(skip(self, triples), fields(backend = BACKEND, count = triples.len()))]
    async fn create(&self, triples: &[Triple]) -> BackendResult<HashSet<Triple>> {
        let created: HashSet<Triple> = triples.iter().cloned().collect();
        if created.is_empty() {
            return Ok(created);
        }

        let mut conn = self.connection().await?;
        let mut pipe = redis::pipe();
        for triple in &created {
            pipe.sadd(
                key::encode(&self.key_prefix, &triple.subject_uuid, &triple.object_uuid),
                &triple.predicate,
            )
            .ignore();
        }
        pipe.query_async::<_, ()>(&mut conn).await.map_err(query_error)?;

        debug!(created = created.len(), "SADD pipeline complete");
        Ok(created)
    }

    #[instrument(skip(self, filter), fields(backend = BACKEND))]
    async fn read(&self, filter: &Filter) -> BackendResult<HashSet<Triple>> {
        let mut conn = self.connection().await?;
        let keys = self.matching_keys(&mut conn, filter).await?;
        if keys.is_empty() {
            return Ok(HashSet::new());
        }

        let mut results = HashSet::new();
        if filter.predicates.is_empty() {
            let mut pipe = redis::pipe();
            for pair in &keys {
                pipe.smembers(&pair.key);
            }
            let members: Vec<HashSet<String>> =
                pipe.query_async(&mut conn).await.map_err(query_error)?;

            for (pair, predicates) in keys.iter().zip(members) {
                results.extend(predicates.into_iter().map(|p| pair.triple(p)));
            }
        } else {
            let predicates = Self::requested_predicates(filter);
            let mut pipe = redis::pipe();
            for pair in &keys {
                for predicate in &predicates {
                    pipe.sismember(&pair.key, *predicate);
                }
            }
            let present: Vec<bool> = pipe.query_async(&mut conn).await.map_err(query_error)?;

            let requests = keys
                .iter()
                .flat_map(|pair| predicates.iter().map(move |p| (pair, *p)));
            for ((pair, predicate), is_member) in requests.zip(present) {
                if is_member {
                    results.insert(pair.triple(predicate));
                }
            }
        }

        Ok(results)
    }

    #[instrument(skip(self, filter), fields(backend = BACKEND))]
    async fn delete(&self, filter: &Filter) -> BackendResult<HashSet<Triple>> {
        let mut conn = self.connection().await?;
        let keys = self.matching_keys(&mut conn, filter).await?;
        if keys.is_empty() {
            return Ok(HashSet::new());
        }

        let mut deleted = HashSet::new();
        if filter.predicates.is_empty() {
            // Read and drop each whole key in one transaction
            let mut pipe = redis::pipe();
            pipe.atomic();
            for pair in &keys {
                pipe.smembers(&pair.key).del(&pair.key).ignore();
            }
            let members: Vec<HashSet<String>> =
                pipe.query_async(&mut conn).await.map_err(query_error)?;

            for (pair, predicates) in keys.iter().zip(members) {
                deleted.extend(predicates.into_iter().map(|p| pair.triple(p)));
            }
        } else {
            // Redis removes a set key once SREM empties it
            let predicates = Self::requested_predicates(filter);
            let mut pipe = redis::pipe();
            pipe.atomic();
            for pair in &keys {
                for predicate in &predicates {
                    pipe.srem(&pair.key, *predicate);
                }
            }
            let removed: Vec<bool> = pipe.query_async(&mut conn).await.map_err(query_error)?;

            let requests = keys
                .iter()
                .flat_map(|pair| predicates.iter().map(move |p| (pair, *p)));
            for ((pair, predicate), was_removed) in requests.zip(removed) {
                if was_removed {
                    deleted.insert(pair.triple(predicate));
                }
            }
        }

        debug!(deleted = deleted.len(), "Removed predicates");
        Ok(deleted)
    }

    async fn health_check(&self) -> BackendResult<bool> {
        let mut conn = self.connection().await?;
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(query_error)?;
        Ok(pong == "PONG")
    }
}
