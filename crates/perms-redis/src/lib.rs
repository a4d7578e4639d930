//! Redis implementation of the perms backend contract
//!
//! Redis has no secondary indexes, so triples are keyed by their ordered
//! `(subject, object)` pair and the value is the set of predicates linking
//! them. Filtering by anything therefore means scanning every pair key.

mod backend;
pub mod key;

use serde::{Deserialize, Serialize};

pub use backend::RedisBackend;

/// Redis connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Connection URL, e.g. `redis://localhost:6379/0`
    pub url: String,

    /// Namespace prepended to every pair key
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_key_prefix() -> String {
    "perms".to_string()
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            key_prefix: default_key_prefix(),
        }
    }
}

impl RedisConfig {
    /// Config for a host name, using the default port and prefix
    pub fn for_host(host: &str) -> Self {
        Self {
            url: format!("redis://{}:6379", host),
            ..Self::default()
        }
    }
}
