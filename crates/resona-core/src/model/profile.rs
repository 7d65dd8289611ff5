use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::embedding;
use crate::error::Result;

/// A user's taste fingerprint: the mean embedding of every track the
/// user has fully played.
///
/// One row per user. Owned and written exclusively by the fingerprint
/// builder; read by the recommender. Overwritten in full on every
/// recomputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TasteProfile {
    pub user_id: i64,
    /// Profile vector as raw little-endian f32 bytes, dimension-matched
    /// to the track embeddings it was averaged from.
    pub vector: Vec<u8>,
    pub updated_at: DateTime<Utc>,
}

impl TasteProfile {
    /// Decode the stored profile vector.
    pub fn decode(&self) -> Result<Vec<f32>> {
        embedding::from_bytes(&self.vector)
    }
}
