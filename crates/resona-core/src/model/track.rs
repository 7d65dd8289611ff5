use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A catalog track: one audio asset matched to metadata.
///
/// Created by the sync pipeline; enrichment fields (tempo, embedding,
/// lyrics, summary) start empty and are filled in as later stages
/// complete. Fields transition from `None` to populated but are never
/// transiently invalid, so serving-path readers may observe a track
/// mid-enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Stable integer identifier, shared with the vector store (where it
    /// is rendered as a string).
    pub id: i64,

    /// Absolute path to the audio file. Globally unique.
    pub file_path: PathBuf,

    pub title: String,
    pub artist: String,

    /// Estimated tempo in beats per minute.
    pub tempo_bpm: Option<f64>,

    /// Musical key, when known.
    pub key_signature: Option<String>,

    /// Full lyrics text fetched from an external lookup.
    pub lyrics: Option<String>,

    /// Short machine-generated summary of the lyrics.
    pub lyric_summary: Option<String>,

    /// Cached embedding as raw little-endian f32 bytes.
    pub embedding: Option<Vec<u8>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Track {
    /// Whether the audio embedding has been computed and cached.
    #[must_use]
    pub const fn has_embedding(&self) -> bool {
        self.embedding.is_some()
    }
}

/// The fields required to create a new catalog row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTrack {
    pub file_path: PathBuf,
    pub title: String,
    pub artist: String,
}

impl NewTrack {
    #[must_use]
    pub fn new(file_path: PathBuf, title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            file_path,
            title: title.into(),
            artist: artist.into(),
        }
    }
}
