//! Error types shared by every backend

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by a [`crate::PermissionBackend`].
///
/// Driver failures are kept intact as the error `source`; the wrapper only
/// records which backend produced them.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("{backend} connection error: {source}")]
    Connection {
        backend: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("{backend} query error: {source}")]
    Query {
        backend: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("{backend} returned data that is not a valid triple: {message}")]
    Mapping {
        backend: &'static str,
        message: String,
    },

    #[error("Invalid backend configuration: {0}")]
    Configuration(String),
}

impl BackendError {
    /// Helper to wrap a driver error raised while connecting
    pub fn connection<E>(backend: &'static str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        BackendError::Connection {
            backend,
            source: Box::new(source),
        }
    }

    /// Helper to wrap a driver error raised by a command or query
    pub fn query<E>(backend: &'static str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        BackendError::Query {
            backend,
            source: Box::new(source),
        }
    }

    pub fn mapping(backend: &'static str, message: impl Into<String>) -> Self {
        BackendError::Mapping {
            backend,
            message: message.into(),
        }
    }

    /// Name of the backend that failed, if the error is backend specific
    pub fn backend(&self) -> Option<&'static str> {
        match self {
            BackendError::Connection { backend, .. }
            | BackendError::Query { backend, .. }
            | BackendError::Mapping { backend, .. } => Some(backend),
            BackendError::Configuration(_) => None,
        }
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;
