//! Embedding byte codec and vector math.
//!
//! Track embeddings are cached in the catalog as raw bytes: each element
//! is a little-endian `f32`, so a vector of dimension `d` serializes to
//! exactly `4 * d` bytes. The codec here is the single source of truth
//! for that layout; both stores and all engines go through it.

use crate::error::{Error, Result};

/// Bytes per serialized vector element.
const ELEMENT_WIDTH: usize = std::mem::size_of::<f32>();

/// Serialize a vector to little-endian `f32` bytes.
#[must_use]
pub fn to_bytes(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * ELEMENT_WIDTH);
    for value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Deserialize little-endian `f32` bytes back into a vector.
///
/// # Errors
/// Returns [`Error::Embedding`] when the buffer is empty or its length
/// is not a multiple of the element width. Callers treat this as a
/// per-row data-integrity failure: skip the row, never abort the batch.
pub fn from_bytes(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.is_empty() {
        return Err(Error::Embedding("empty embedding blob".to_string()));
    }
    if bytes.len() % ELEMENT_WIDTH != 0 {
        return Err(Error::Embedding(format!(
            "blob length {} is not a multiple of {}",
            bytes.len(),
            ELEMENT_WIDTH
        )));
    }

    let vector = bytes
        .chunks_exact(ELEMENT_WIDTH)
        .map(|chunk| {
            let mut raw = [0u8; ELEMENT_WIDTH];
            raw.copy_from_slice(chunk);
            f32::from_le_bytes(raw)
        })
        .collect();

    Ok(vector)
}

/// Element-wise arithmetic mean of a set of equal-dimension vectors.
///
/// Returns `None` for an empty input. All vectors must share the first
/// vector's dimension; callers filter mismatched rows before averaging.
#[must_use]
pub fn mean(vectors: &[Vec<f32>]) -> Option<Vec<f32>> {
    let first = vectors.first()?;
    let dim = first.len();

    let mut sums = vec![0.0f64; dim];
    for vector in vectors {
        debug_assert_eq!(vector.len(), dim);
        for (sum, value) in sums.iter_mut().zip(vector) {
            *sum += f64::from(*value);
        }
    }

    let count = vectors.len() as f64;
    Some(sums.iter().map(|sum| (sum / count) as f32).collect())
}

/// Cosine similarity between two vectors: `dot(a,b) / (||a|| * ||b||)`.
///
/// Defined as 0.0 when either norm is zero, or when the dimensions
/// disagree (a mismatched candidate should rank nowhere, not panic).
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
}

/// Fuse an audio embedding with an optional lyric embedding into the
/// stored track vector.
///
/// Today the stored vector is the audio embedding alone; lyric fusion
/// lands here without touching the sync pipeline's control flow.
#[must_use]
pub fn fuse(audio: &[f32], lyric: Option<&[f32]>) -> Vec<f32> {
    let _ = lyric;
    audio.to_vec()
}
