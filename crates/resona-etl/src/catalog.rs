//! The Catalog stage: resolve metadata records to audio assets and
//! keep the relational catalog current.
//!
//! Each feed record is matched to an audio file, a track row is
//! created if one does not exist for that path, and the expensive
//! derived fields (tempo, audio embedding) are computed only when
//! missing. Running the stage twice over the same inputs does no
//! duplicate work.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use treadle::{Stage, StageContext, StageOutcome};

use crate::audio;
use crate::error::SyncResult;
use crate::matching;
use resona_core::embedding;
use resona_core::model::NewTrack;
use resona_core::schema::CatalogDb;
use resona_search::EmbeddingGateway;

/// Decode target for tempo analysis. The envelope does not need more.
const TEMPO_SAMPLE_RATE: u32 = 11025;

/// Counters for one catalog sync run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CatalogSummary {
    /// Feed records resolved to an audio asset.
    pub matched: usize,
    /// Feed records skipped (incomplete or unmatched).
    pub skipped: usize,
    /// New track rows created.
    pub created: usize,
    /// Tracks that got a tempo estimate this run.
    pub tempo_computed: usize,
    /// Tracks that got an audio embedding this run.
    pub embedded: usize,
}

impl fmt::Display for CatalogSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} matched, {} skipped, {} created, {} tempos, {} embeddings",
            self.matched, self.skipped, self.created, self.tempo_computed, self.embedded
        )
    }
}

/// A track needing derived-field work after the matching phase.
#[derive(Debug)]
struct TrackTask {
    id: i64,
    path: PathBuf,
    needs_tempo: bool,
    needs_embedding: bool,
}

/// The Catalog stage.
#[derive(Debug)]
pub struct CatalogStage {
    metadata_path: PathBuf,
    audio_dir: PathBuf,
    db_path: PathBuf,
    gateway: Arc<dyn EmbeddingGateway>,
}

impl CatalogStage {
    pub fn new(
        metadata_path: PathBuf,
        audio_dir: PathBuf,
        db_path: PathBuf,
        gateway: Arc<dyn EmbeddingGateway>,
    ) -> Self {
        Self {
            metadata_path,
            audio_dir,
            db_path,
            gateway,
        }
    }

    /// Run one sync pass over the metadata feed.
    ///
    /// # Errors
    /// Fails on an unreadable feed or a catalog fault. A record that
    /// cannot be matched, or an asset that cannot be analyzed, is
    /// skipped with a warning instead.
    pub async fn sync_catalog(&self) -> SyncResult<CatalogSummary> {
        let records = matching::load_metadata(&self.metadata_path)?;
        let assets = matching::list_audio_assets(&self.audio_dir)?;
        log::info!(
            "Syncing {} metadata records against {} audio assets",
            records.len(),
            assets.len()
        );

        let mut summary = CatalogSummary::default();
        let mut tasks: Vec<TrackTask> = Vec::new();
        let mut seen: HashSet<i64> = HashSet::new();

        // Matching phase: resolve every record to a track row. The DB
        // handle stays out of the later async phase.
        {
            let db = CatalogDb::open(&self.db_path)?;
            for record in &records {
                let (Some(title), Some(artist)) = (record.title.as_deref(), record.artist.as_deref())
                else {
                    log::warn!("Skipping feed record without title or artist: {record:?}");
                    summary.skipped += 1;
                    continue;
                };

                let normalized_title = matching::normalize(title);
                let normalized_artist = matching::normalize(matching::primary_artist(artist));
                if normalized_title.is_empty() || normalized_artist.is_empty() {
                    log::warn!("Skipping feed record with unusable title/artist: {title:?} / {artist:?}");
                    summary.skipped += 1;
                    continue;
                }

                let Some(asset) = matching::find_match(&normalized_title, &normalized_artist, &assets)
                else {
                    log::warn!("No audio asset matches {artist} - {title}");
                    summary.skipped += 1;
                    continue;
                };
                summary.matched += 1;

                let track = match db.get_track_by_path(&asset.path)? {
                    Some(track) => track,
                    None => match db.insert_track(&NewTrack::new(
                        asset.path.clone(),
                        title,
                        artist,
                    )) {
                        Ok(track) => {
                            log::info!("Cataloged {} -> {}", asset.path.display(), track.id);
                            summary.created += 1;
                            track
                        }
                        // Lost a race on the unique path; the row exists now.
                        Err(e) if e.is_conflict() => db
                            .get_track_by_path(&asset.path)?
                            .ok_or(e)?,
                        Err(e) => return Err(e.into()),
                    },
                };

                if !seen.insert(track.id) {
                    continue;
                }
                tasks.push(TrackTask {
                    id: track.id,
                    path: asset.path.clone(),
                    needs_tempo: track.tempo_bpm.is_none(),
                    needs_embedding: !track.has_embedding(),
                });
            }
        }

        // Analysis phase: fill in missing derived fields.
        for task in tasks {
            if task.needs_tempo {
                match audio::decode_audio(&task.path, TEMPO_SAMPLE_RATE) {
                    Ok(decoded) => {
                        if let Some(bpm) = audio::estimate_bpm(&decoded.samples, decoded.sample_rate)
                        {
                            let db = CatalogDb::open(&self.db_path)?;
                            db.set_tempo(task.id, bpm)?;
                            summary.tempo_computed += 1;
                        } else {
                            log::debug!("No stable tempo for {}", task.path.display());
                        }
                    }
                    Err(e) => log::warn!("Tempo analysis skipped: {e}"),
                }
            }

            if task.needs_embedding {
                match self.gateway.embed_audio(&task.path).await {
                    Some(vector) => {
                        let db = CatalogDb::open(&self.db_path)?;
                        db.set_embedding(task.id, &embedding::to_bytes(&vector))?;
                        summary.embedded += 1;
                    }
                    None => log::warn!(
                        "Embedding gateway failed for {}; will retry next run",
                        task.path.display()
                    ),
                }
            }
        }

        Ok(summary)
    }
}

#[async_trait::async_trait]
impl Stage for CatalogStage {
    fn name(&self) -> &str {
        "catalog"
    }

    async fn execute(
        &self,
        _item: &dyn treadle::WorkItem,
        _context: &mut StageContext,
    ) -> treadle::Result<StageOutcome> {
        log::info!("Starting catalog sync from {}", self.metadata_path.display());

        match self.sync_catalog().await {
            Ok(summary) => {
                log::info!("Catalog sync complete: {summary}");
                Ok(StageOutcome::Complete)
            }
            Err(e) => Err(treadle::TreadleError::StageExecution(format!(
                "Catalog sync failed: {e}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
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
            Some(vec![1.0, 0.0])
        }

        async fn embed_audio(&self, _path: &Path) -> Option<Vec<f32>> {
            self.audio_calls.fetch_add(1, Ordering::SeqCst);
            Some(vec![1.0, 0.0])
        }
    }

    fn write_feed(dir: &Path) -> PathBuf {
        let feed = dir.join("feed.json");
        fs::write(
            &feed,
            r#"[
                {"title": "Neon Nights", "artist": "Aurora, Kygo"},
                {"title": "Lost Song", "artist": "Nobody"},
                {"title": "Broken", "artist": null}
            ]"#,
        )
        .unwrap();
        feed
    }

    fn stage_fixture(tmp: &TempDir) -> (CatalogStage, Arc<CountingGateway>) {
        let audio_dir = tmp.path().join("music");
        fs::create_dir_all(&audio_dir).unwrap();
        // Stems carry both normalized title and primary artist.
        fs::write(audio_dir.join("aurora_neon_nights.mp3"), b"").unwrap();

        let feed = write_feed(tmp.path());
        let gateway = Arc::new(CountingGateway::default());
        let stage = CatalogStage::new(
            feed,
            audio_dir,
            tmp.path().join("catalog.db"),
            gateway.clone(),
        );
        (stage, gateway)
    }

    #[tokio::test]
    async fn test_sync_creates_matched_tracks_only() {
        let tmp = TempDir::new().unwrap();
        let (stage, _gateway) = stage_fixture(&tmp);

        let summary = stage.sync_catalog().await.unwrap();
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.skipped, 2);

        let db = CatalogDb::open(tmp.path().join("catalog.db")).unwrap();
        assert_eq!(db.track_count().unwrap(), 1);
        let track = db.list_tracks().unwrap().remove(0);
        assert_eq!(track.title, "Neon Nights");
        assert_eq!(track.artist, "Aurora, Kygo");
        assert!(track.has_embedding());
    }

    #[tokio::test]
    async fn test_second_run_does_no_duplicate_work() {
        let tmp = TempDir::new().unwrap();
        let (stage, gateway) = stage_fixture(&tmp);

        stage.sync_catalog().await.unwrap();
        assert_eq!(gateway.audio_calls.load(Ordering::SeqCst), 1);

        let summary = stage.sync_catalog().await.unwrap();
        assert_eq!(summary.created, 0);
        assert_eq!(summary.embedded, 0);
        // Embedding is cached; the gateway is not consulted again.
        assert_eq!(gateway.audio_calls.load(Ordering::SeqCst), 1);

        let db = CatalogDb::open(tmp.path().join("catalog.db")).unwrap();
        assert_eq!(db.track_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_gateway_failure_leaves_track_retryable() {
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
        let audio_dir = tmp.path().join("music");
        fs::create_dir_all(&audio_dir).unwrap();
        fs::write(audio_dir.join("aurora_neon_nights.mp3"), b"").unwrap();
        let feed = write_feed(tmp.path());

        let stage = CatalogStage::new(
            feed,
            audio_dir,
            tmp.path().join("catalog.db"),
            Arc::new(FailingGateway),
        );
        let summary = stage.sync_catalog().await.unwrap();
        assert_eq!(summary.created, 1);
        assert_eq!(summary.embedded, 0);

        let db = CatalogDb::open(tmp.path().join("catalog.db")).unwrap();
        let track = db.list_tracks().unwrap().remove(0);
        // Row exists without an embedding; the next run fills it in.
        assert!(!track.has_embedding());
    }

    #[test]
    fn test_stage_name() {
        let tmp = TempDir::new().unwrap();
        let (stage, _gateway) = stage_fixture(&tmp);
        assert_eq!(stage.name(), "catalog");
    }
}
