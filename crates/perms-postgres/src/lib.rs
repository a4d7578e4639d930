//! PostgreSQL implementation of the perms backend contract
//!
//! Triples live in a single `perms` table with one row per triple. The table
//! and its indexes are provisioned lazily on first use.

mod backend;
pub mod connection;
pub mod query;
pub mod schema;

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnectOptions;
use std::time::Duration;

pub use backend::PostgresBackend;

/// Configuration for PostgreSQL connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Timeout for acquiring a connection from the pool (in seconds)
    pub acquire_timeout_secs: u64,

    /// How many times to try reaching the server before giving up
    pub connect_attempts: u32,

    /// Fixed pause between connection attempts (in seconds)
    pub connect_retry_delay_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "postgres".to_string(),
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            max_connections: 5,
            acquire_timeout_secs: 30,
            connect_attempts: 5,
            connect_retry_delay_secs: 1,
        }
    }
}

impl PostgresConfig {
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.dbname)
            .username(&self.user)
            .password(&self.password)
    }

    pub fn connect_retry_delay(&self) -> Duration {
        Duration::from_secs(self.connect_retry_delay_secs)
    }
}
