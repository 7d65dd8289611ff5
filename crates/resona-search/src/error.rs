//! Engine error types for the serving path.

use thiserror::Error;

/// Errors surfaced by the fingerprint, recommendation, and search
/// engines.
///
/// The `No*` variants are "no signal" outcomes: user-facing empty
/// results that callers distinguish from faults. Store and codec faults
/// propagate through [`EngineError::Core`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// The user has no positive listening events at all.
    #[error("no listening history for user {user_id}")]
    NoHistory { user_id: i64 },

    /// The user has history, but none of the played tracks has a cached
    /// embedding yet.
    #[error("no embedded listening history for user {user_id}")]
    NoEmbeddedHistory { user_id: i64 },

    /// The search query was empty or whitespace-only.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// An error propagated from the catalog or vector store.
    #[error(transparent)]
    Core(#[from] resona_core::Error),
}

impl EngineError {
    /// Returns `true` when the error means "nothing to work with"
    /// rather than a fault.
    #[must_use]
    pub const fn is_no_signal(&self) -> bool {
        matches!(
            self,
            Self::NoHistory { .. } | Self::NoEmbeddedHistory { .. } | Self::InvalidQuery(_)
        )
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
