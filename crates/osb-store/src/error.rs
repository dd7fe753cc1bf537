//! Store error types

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by an `InstanceStore`
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// No object with the given name exists in the namespace
    #[error("serviceinstances \"{name}\" not found in namespace {namespace}")]
    NotFound { namespace: String, name: String },

    /// Create was called for a name that is already taken
    #[error("serviceinstances \"{name}\" already exists in namespace {namespace}")]
    AlreadyExists { namespace: String, name: String },

    /// Update carried a stale version token
    #[error(
        "conflict on serviceinstances \"{name}\" in namespace {namespace}: \
         expected version {expected}, found {actual}"
    )]
    Conflict {
        namespace: String,
        name: String,
        expected: u64,
        actual: u64,
    },

    /// Encoding or decoding through the scheme failed
    #[error("codec error: {0}")]
    Codec(String),

    /// The store is shutting down and no longer accepts calls
    #[error("store closed")]
    Closed,

    /// A backend-specific failure (connection, I/O, ...)
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(namespace: &str, name: &str) -> Self {
        StoreError::NotFound {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    pub fn already_exists(namespace: &str, name: &str) -> Self {
        StoreError::AlreadyExists {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Codec(e.to_string())
    }
}
