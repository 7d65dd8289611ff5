//! The Vectorize stage: project cataloged tracks into the vector
//! store.
//!
//! A track already present in the store is skipped outright, which is
//! what makes re-running the pipeline cheap: "contains" in the vector
//! store is the processed-marker for this stage. Tracks without a
//! cached embedding get one computed (and cached back) first, so the
//! two stores converge rather than drift.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use treadle::{Stage, StageContext, StageOutcome};

use crate::error::SyncResult;
use resona_core::embedding;
use resona_core::schema::CatalogDb;
use resona_search::{EmbeddingGateway, VectorStore};

/// Counters for one vectorize run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VectorizeSummary {
    pub upserted: usize,
    pub already_present: usize,
    pub skipped: usize,
}

impl fmt::Display for VectorizeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} upserted, {} already present, {} skipped",
            self.upserted, self.already_present, self.skipped
        )
    }
}

/// The Vectorize stage.
#[derive(Debug)]
pub struct VectorizeStage {
    db_path: PathBuf,
    vector_db_path: PathBuf,
    gateway: Arc<dyn EmbeddingGateway>,
}

impl VectorizeStage {
    pub fn new(
        db_path: PathBuf,
        vector_db_path: PathBuf,
        gateway: Arc<dyn EmbeddingGateway>,
    ) -> Self {
        Self {
            db_path,
            vector_db_path,
            gateway,
        }
    }

    /// Push every unprocessed track into the vector store.
    ///
    /// # Errors
    /// Fails on a store fault. A track whose embedding cannot be
    /// obtained is skipped with a warning and retried next run.
    pub async fn vectorize(&self) -> SyncResult<VectorizeSummary> {
        let tracks = {
            let db = CatalogDb::open(&self.db_path)?;
            db.list_tracks()?
        };

        let mut summary = VectorizeSummary::default();
        for track in tracks {
            let id = track.id.to_string();
            {
                let store = VectorStore::open(&self.vector_db_path)?;
                if store.contains(&id)? {
                    summary.already_present += 1;
                    continue;
                }
            }

            // Prefer the cached embedding; fall back to the gateway and
            // cache the result so the catalog converges too.
            let audio_vector = match track.embedding.as_deref().map(embedding::from_bytes) {
                Some(Ok(vector)) => Some(vector),
                Some(Err(e)) => {
                    log::warn!("Discarding malformed cached embedding for track {}: {e}", track.id);
                    None
                }
                None => None,
            };
            let audio_vector = match audio_vector {
                Some(vector) => vector,
                None => match self.gateway.embed_audio(&track.file_path).await {
                    Some(vector) => {
                        let db = CatalogDb::open(&self.db_path)?;
                        db.set_embedding(track.id, &embedding::to_bytes(&vector))?;
                        vector
                    }
                    None => {
                        log::warn!(
                            "No embedding available for track {}; skipping",
                            track.id
                        );
                        summary.skipped += 1;
                        continue;
                    }
                },
            };

            let stored = embedding::fuse(&audio_vector, None);
            let metadata = serde_json::json!({
                "title": track.title,
                "artist": track.artist,
            });
            let store = VectorStore::open(&self.vector_db_path)?;
            store.upsert(&id, &stored, Some(&metadata))?;
            summary.upserted += 1;
        }

        Ok(summary)
    }
}

#[async_trait::async_trait]
impl Stage for VectorizeStage {
    fn name(&self) -> &str {
        "vectorize"
    }

    async fn execute(
        &self,
        _item: &dyn treadle::WorkItem,
        _context: &mut StageContext,
    ) -> treadle::Result<StageOutcome> {
        match self.vectorize().await {
            Ok(summary) => {
                log::info!("Vectorize complete: {summary}");
                Ok(StageOutcome::Complete)
            }
            Err(e) => Err(treadle::TreadleError::StageExecution(format!(
                "Vectorize failed: {e}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resona_core::model::NewTrack;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[derive(Debug, Default)]
    struct CountingGateway {
        audio_calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl EmbeddingGateway for CountingGateway {
        async fn embed_text(&self, _text: &str) -> Option<Vec<f32>> {
            Some(vec![0.3, 0.7])
        }

        async fn embed_audio(&self, _path: &Path) -> Option<Vec<f32>> {
            self.audio_calls.fetch_add(1, Ordering::SeqCst);
            Some(vec![0.3, 0.7])
        }
    }

    fn seed_track(db_path: &Path, path: &str, vector: Option<&[f32]>) -> i64 {
        let db = CatalogDb::open(db_path).unwrap();
        let track = db
            .insert_track(&NewTrack::new(PathBuf::from(path), "Title", "Artist"))
            .unwrap();
        if let Some(vector) = vector {
            db.set_embedding(track.id, &embedding::to_bytes(vector))
                .unwrap();
        }
        track.id
    }

    #[tokio::test]
    async fn test_vectorize_uses_cached_embedding() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("catalog.db");
        let vec_path = tmp.path().join("vectors.db");
        let id = seed_track(&db_path, "/music/a.mp3", Some(&[1.0, 0.0]));

        let gateway = Arc::new(CountingGateway::default());
        let stage = VectorizeStage::new(db_path, vec_path.clone(), gateway.clone());

        let summary = stage.vectorize().await.unwrap();
        assert_eq!(summary.upserted, 1);
        assert_eq!(gateway.audio_calls.load(Ordering::SeqCst), 0);

        let store = VectorStore::open(&vec_path).unwrap();
        let record = store.get(&id.to_string()).unwrap().unwrap();
        assert_eq!(record.embedding, vec![1.0, 0.0]);
        assert_eq!(record.metadata.unwrap()["title"], "Title");
    }

    #[tokio::test]
    async fn test_vectorize_computes_and_caches_missing_embedding() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("catalog.db");
        let vec_path = tmp.path().join("vectors.db");
        let id = seed_track(&db_path, "/music/a.mp3", None);

        let gateway = Arc::new(CountingGateway::default());
        let stage = VectorizeStage::new(db_path.clone(), vec_path, gateway.clone());

        let summary = stage.vectorize().await.unwrap();
        assert_eq!(summary.upserted, 1);
        assert_eq!(gateway.audio_calls.load(Ordering::SeqCst), 1);

        // The fresh embedding was written back to the catalog.
        let db = CatalogDb::open(&db_path).unwrap();
        let track = db.get_track(id).unwrap().unwrap();
        assert!(track.has_embedding());
    }

    #[tokio::test]
    async fn test_second_run_skips_processed_tracks() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("catalog.db");
        let vec_path = tmp.path().join("vectors.db");
        seed_track(&db_path, "/music/a.mp3", Some(&[1.0, 0.0]));

        let gateway = Arc::new(CountingGateway::default());
        let stage = VectorizeStage::new(db_path, vec_path, gateway);

        stage.vectorize().await.unwrap();
        let summary = stage.vectorize().await.unwrap();
        assert_eq!(summary.upserted, 0);
        assert_eq!(summary.already_present, 1);
    }

    #[tokio::test]
    async fn test_gateway_failure_skips_track() {
        #[derive(Debug)]
        struct FailingGateway;

        #[async_trait::async_trait]
        impl EmbeddingGateway for FailingGateway {
            async fn embed_text(&self, _text: &str) -> Option<Vec<f32>> {
                None
            }
            async fn embed_audio(&self, _path: &Path) -> Option<Vec<f32>> {
                None
            }
        }

        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("catalog.db");
        let vec_path = tmp.path().join("vectors.db");
        seed_track(&db_path, "/music/a.mp3", None);

        let stage = VectorizeStage::new(db_path, vec_path.clone(), Arc::new(FailingGateway));
        let summary = stage.vectorize().await.unwrap();
        assert_eq!(summary.skipped, 1);
        assert!(VectorStore::open(&vec_path).unwrap().is_empty().unwrap());
    }
}
