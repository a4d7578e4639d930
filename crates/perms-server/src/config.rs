//! Configuration for the perms server
//!
//! Values come from environment variables, after `dotenv` has loaded an
//! optional `.env` file. Unset variables keep their defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use tracing::{info, warn};

use crate::error::ServerResult;
use crate::factory::BackendKind;

#[cfg(feature = "mongodb")]
use perms_mongodb::MongoConfig;
#[cfg(feature = "neo4j")]
use perms_neo4j::Neo4jConfig;
#[cfg(feature = "postgres")]
use perms_postgres::PostgresConfig;
#[cfg(feature = "redis")]
use perms_redis::RedisConfig;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Storage backend to serve from
    #[serde(default)]
    pub backend: BackendKind,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Host to bind to
    #[serde(default = "default_host")]
    pub bind_address: String,

    /// Log level, used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[cfg(feature = "redis")]
    #[serde(default)]
    pub redis: RedisConfig,

    #[cfg(feature = "postgres")]
    #[serde(default)]
    pub postgres: PostgresConfig,

    #[cfg(feature = "mongodb")]
    #[serde(default)]
    pub mongodb: MongoConfig,

    #[cfg(feature = "neo4j")]
    #[serde(default)]
    pub neo4j: Neo4jConfig,
}

fn default_port() -> u16 {
    8000
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            port: default_port(),
            bind_address: default_host(),
            log_level: default_log_level(),
            #[cfg(feature = "redis")]
            redis: RedisConfig::default(),
            #[cfg(feature = "postgres")]
            postgres: PostgresConfig::default(),
            #[cfg(feature = "mongodb")]
            mongodb: MongoConfig::default(),
            #[cfg(feature = "neo4j")]
            neo4j: Neo4jConfig::default(),
        }
    }
}

/// Overwrite `target` with the parsed value of `name`, keeping the current
/// value (and logging) when it does not parse.
fn parse_into<T, F>(lookup: &F, name: &str, target: &mut T)
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(name) {
        match raw.parse::<T>() {
            Ok(value) => *target = value,
            Err(e) => warn!("Invalid {} value: {} ({})", name, raw, e),
        }
    }
}

fn set_string<F>(lookup: &F, name: &str, target: &mut String)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(name) {
        *target = value;
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn load() -> ServerResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from any name -> value source
    pub fn from_lookup<F>(lookup: F) -> ServerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(backend) = lookup("BACKEND") {
            config.backend = backend.parse()?;
        }
        set_string(&lookup, "SERVER_HOST", &mut config.bind_address);
        parse_into(&lookup, "SERVER_PORT", &mut config.port);
        set_string(&lookup, "LOG_LEVEL", &mut config.log_level);

        #[cfg(feature = "redis")]
        {
            if let Some(url) = lookup("REDIS_URL") {
                config.redis.url = url;
            } else if let Some(host) = lookup("REDIS_HOST") {
                config.redis = RedisConfig::for_host(&host);
            }
        }

        #[cfg(feature = "postgres")]
        {
            let postgres = &mut config.postgres;
            set_string(&lookup, "POSTGRES_HOST", &mut postgres.host);
            parse_into(&lookup, "POSTGRES_PORT", &mut postgres.port);
            set_string(&lookup, "POSTGRES_DBNAME", &mut postgres.dbname);
            set_string(&lookup, "POSTGRES_USER", &mut postgres.user);
            set_string(&lookup, "POSTGRES_PASSWORD", &mut postgres.password);
        }

        #[cfg(feature = "mongodb")]
        {
            let mongodb = &mut config.mongodb;
            set_string(&lookup, "MONGO_HOST", &mut mongodb.host);
            set_string(&lookup, "MONGO_USER", &mut mongodb.user);
            set_string(&lookup, "MONGO_PASSWORD", &mut mongodb.password);
            set_string(&lookup, "MONGO_DATABASE", &mut mongodb.database);
        }

        #[cfg(feature = "neo4j")]
        {
            if let Some(uri) = lookup("NEO4J_URI") {
                config.neo4j.uri = uri;
            } else if let Some(host) = lookup("NEO4J_HOST") {
                config.neo4j.uri = Neo4jConfig::for_host(&host).uri;
            }
            set_string(&lookup, "NEO4J_USER", &mut config.neo4j.user);
            set_string(&lookup, "NEO4J_PASSWORD", &mut config.neo4j.password);
            if let Some(database) = lookup("NEO4J_DATABASE") {
                config.neo4j.database = Some(database);
            }

            let mut batch_size = config.neo4j.batch_size;
            parse_into(&lookup, "NEO4J_BATCH_SIZE", &mut batch_size);
            if batch_size == 0 {
                warn!("NEO4J_BATCH_SIZE must be at least 1, keeping {}", config.neo4j.batch_size);
            } else {
                config.neo4j.batch_size = batch_size;
            }
        }

        info!(backend = %config.backend, port = config.port, "Loaded server configuration");
        Ok(config)
    }
}
