//! MongoDB implementation of the perms backend contract
//!
//! One document per triple in a single collection. UUIDs are stored as BSON
//! binary subtype 4 so other drivers read them back as UUIDs.

mod backend;
pub mod document;

use serde::{Deserialize, Serialize};

pub use backend::MongoBackend;

/// MongoDB connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoConfig {
    /// `host[:port]` of the server or a comma separated seed list
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub collection: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            host: "localhost:27017".to_string(),
            user: String::new(),
            password: String::new(),
            database: "db".to_string(),
            collection: "perms".to_string(),
        }
    }
}
