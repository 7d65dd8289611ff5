use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("conflict: {entity} with key {key} already exists")]
    Conflict { entity: &'static str, key: String },

    #[error("malformed embedding: {0}")]
    Embedding(String),
}

impl Error {
    /// Returns `true` when the error is a unique-key conflict.
    ///
    /// The sync pipeline treats conflicts as skip-and-continue rather
    /// than aborting the batch.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
