use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use treadle::WorkItem;

/// One sync run flowing through the pipeline.
///
/// This is the treadle `WorkItem` for the catalog → vectorize →
/// enrich stages. The stages operate on the whole feed, so a batch
/// identifies a (feed, audio directory) pair rather than a single
/// file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncBatch {
    /// Unique ID for this work item.
    id: String,
    /// Path to the metadata feed (a JSON array of records).
    pub metadata_path: PathBuf,
    /// Directory holding the audio assets.
    pub audio_dir: PathBuf,
}

impl SyncBatch {
    #[must_use]
    pub fn new(id: impl Into<String>, metadata_path: PathBuf, audio_dir: PathBuf) -> Self {
        Self {
            id: id.into(),
            metadata_path,
            audio_dir,
        }
    }
}

impl WorkItem for SyncBatch {
    fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for SyncBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}",
            self.metadata_path.display(),
            self.audio_dir.display()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_batch_creation() {
        let batch = SyncBatch::new(
            "batch-1",
            PathBuf::from("/feeds/drop.json"),
            PathBuf::from("/music"),
        );
        assert_eq!(batch.id(), "batch-1");
        assert_eq!(batch.metadata_path, PathBuf::from("/feeds/drop.json"));
    }

    #[test]
    fn test_sync_batch_display() {
        let batch = SyncBatch::new(
            "batch-1",
            PathBuf::from("/feeds/drop.json"),
            PathBuf::from("/music"),
        );
        assert_eq!(format!("{batch}"), "/feeds/drop.json -> /music");
    }
}
