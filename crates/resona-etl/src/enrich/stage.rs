//! Fan-out enrichment stage.
//!
//! Runs the lyrics lookup, MusicBrainz metadata fetch, and lyric
//! summarization as independent treadle subtasks, so one flaky source
//! does not block the others. Every subtask writes only fields that
//! are currently empty, which keeps re-runs cheap and idempotent.

use std::path::PathBuf;

use treadle::{Stage, StageContext, StageOutcome, SubTask};

use crate::config::Config;
use crate::enrich::lyrics::LyricsClient;
use crate::enrich::musicbrainz::MusicBrainzClient;
use crate::enrich::resilience::RateLimiter;
use crate::enrich::summary::SummaryClient;
use resona_core::schema::CatalogDb;
use resona_search::VectorStore;

fn stage_err(message: impl std::fmt::Display) -> treadle::TreadleError {
    treadle::TreadleError::StageExecution(message.to_string())
}

/// The Enrich stage: fan-out to lyrics, metadata, and summary sources.
///
/// Each source runs as an independent subtask. If one source fails,
/// the others can still succeed and the failed source can be retried
/// independently.
#[derive(Debug)]
pub struct EnrichStage {
    lyrics: Option<LyricsClient>,
    musicbrainz: Option<MusicBrainzClient>,
    summary: Option<SummaryClient>,
    mb_limiter: RateLimiter,
    db_path: PathBuf,
    vector_db_path: PathBuf,
}

impl EnrichStage {
    /// Create a new `EnrichStage` from configuration.
    ///
    /// Lyrics and MusicBrainz need no credentials and are always
    /// enabled; summarization requires a configured sidecar URL.
    pub fn new(config: &Config) -> Self {
        let lyrics = LyricsClient::new(config.lyrics_api_url.clone()).ok();
        let musicbrainz = MusicBrainzClient::new().ok();
        let summary = config
            .summarizer_url
            .as_ref()
            .and_then(|url| SummaryClient::new(url.clone()).ok());

        Self {
            lyrics,
            musicbrainz,
            summary,
            // MusicBrainz allows 1 request/second.
            mb_limiter: RateLimiter::new(1),
            db_path: config.database_path.clone(),
            vector_db_path: config.vector_db_path.clone(),
        }
    }

    /// List which enrichment sources are enabled.
    #[must_use]
    pub fn enabled_sources(&self) -> Vec<&str> {
        let mut sources = Vec::new();
        if self.lyrics.is_some() {
            sources.push("lyrics");
        }
        if self.musicbrainz.is_some() {
            sources.push("metadata");
        }
        if self.summary.is_some() {
            sources.push("summary");
        }
        sources
    }

    async fn enrich_lyrics(&self) -> Result<(), treadle::TreadleError> {
        let client = self
            .lyrics
            .as_ref()
            .ok_or_else(|| stage_err("lyrics client not available"))?;

        // Read phase: collect targets, then drop the DB before async work.
        let pending: Vec<(i64, String, String)> = {
            let db = CatalogDb::open(&self.db_path).map_err(stage_err)?;
            db.list_tracks()
                .map_err(stage_err)?
                .into_iter()
                .filter(|track| track.lyrics.is_none())
                .map(|track| (track.id, track.artist, track.title))
                .collect()
        };

        let mut fetched = 0usize;
        for (track_id, artist, title) in &pending {
            let Some(text) = client.lookup(artist, title).await else {
                log::debug!("No lyrics found for track {track_id} ({artist} - {title})");
                continue;
            };
            let db = CatalogDb::open(&self.db_path).map_err(stage_err)?;
            db.set_lyrics(*track_id, &text).map_err(stage_err)?;
            fetched += 1;
        }

        log::info!(
            "Lyrics enrichment: {fetched} fetched, {} pending before run",
            pending.len()
        );
        Ok(())
    }

    async fn enrich_metadata(&self) -> Result<(), treadle::TreadleError> {
        let client = self
            .musicbrainz
            .as_ref()
            .ok_or_else(|| stage_err("MusicBrainz client not available"))?;

        let tracks: Vec<(i64, String, String)> = {
            let db = CatalogDb::open(&self.db_path).map_err(stage_err)?;
            db.list_tracks()
                .map_err(stage_err)?
                .into_iter()
                .map(|track| (track.id, track.artist, track.title))
                .collect()
        };

        let mut enriched = 0usize;
        for (track_id, artist, title) in tracks {
            let id = track_id.to_string();

            // Only tracks already in the vector store get a metadata
            // bag, and only once.
            let record = {
                let store = VectorStore::open(&self.vector_db_path).map_err(stage_err)?;
                store.get(&id).map_err(stage_err)?
            };
            let Some(record) = record else {
                continue;
            };
            let mut bag = record
                .metadata
                .clone()
                .unwrap_or_else(|| serde_json::json!({}));
            if bag.get("year").is_some() || bag.get("tags").is_some() {
                continue;
            }

            self.mb_limiter.acquire().await;
            let recording = match client.search_recording(&artist, &title).await {
                Ok(Some(recording)) => recording,
                Ok(None) => {
                    log::debug!("No confident MusicBrainz match for {artist} - {title}");
                    continue;
                }
                Err(e) => {
                    log::warn!("MusicBrainz lookup failed for {artist} - {title}: {e}");
                    continue;
                }
            };

            if let Some(object) = bag.as_object_mut() {
                if let Some(year) = recording.release_year() {
                    object.insert("year".to_string(), serde_json::json!(year));
                }
                object.insert("tags".to_string(), serde_json::json!(recording.tag_names()));
            }

            let store = VectorStore::open(&self.vector_db_path).map_err(stage_err)?;
            store
                .upsert(&id, &record.embedding, Some(&bag))
                .map_err(stage_err)?;
            enriched += 1;
        }

        log::info!("Metadata enrichment: {enriched} tracks updated");
        Ok(())
    }

    async fn enrich_summaries(&self) -> Result<(), treadle::TreadleError> {
        let client = self
            .summary
            .as_ref()
            .ok_or_else(|| stage_err("summary client not available"))?;

        let pending: Vec<(i64, String)> = {
            let db = CatalogDb::open(&self.db_path).map_err(stage_err)?;
            db.list_tracks()
                .map_err(stage_err)?
                .into_iter()
                .filter(|track| track.lyric_summary.is_none())
                .filter_map(|track| track.lyrics.map(|lyrics| (track.id, lyrics)))
                .collect()
        };

        let mut summarized = 0usize;
        for (track_id, lyrics) in pending {
            let Some(summary) = client.summarize(&lyrics).await else {
                log::debug!("Summarizer produced nothing for track {track_id}");
                continue;
            };
            let db = CatalogDb::open(&self.db_path).map_err(stage_err)?;
            db.set_lyric_summary(track_id, &summary).map_err(stage_err)?;
            summarized += 1;
        }

        log::info!("Summary enrichment: {summarized} tracks summarized");
        Ok(())
    }
}

#[async_trait::async_trait]
impl Stage for EnrichStage {
    fn name(&self) -> &str {
        "enrich"
    }

    async fn execute(
        &self,
        item: &dyn treadle::WorkItem,
        ctx: &mut StageContext,
    ) -> treadle::Result<StageOutcome> {
        match ctx.subtask_name.as_deref() {
            // First call: fan out to all enabled sources
            None => {
                let mut subtasks = Vec::new();
                if self.lyrics.is_some() {
                    subtasks.push(SubTask::new("lyrics".to_string()));
                }
                if self.musicbrainz.is_some() {
                    subtasks.push(SubTask::new("metadata".to_string()));
                }
                if self.summary.is_some() {
                    subtasks.push(SubTask::new("summary".to_string()));
                }

                if subtasks.is_empty() {
                    log::warn!("No enrichment sources enabled");
                    return Ok(StageOutcome::Complete);
                }

                log::info!(
                    "Enriching {} with {} sources: {:?}",
                    item.id(),
                    subtasks.len(),
                    self.enabled_sources()
                );

                Ok(StageOutcome::FanOut(subtasks))
            }

            Some("lyrics") => {
                self.enrich_lyrics().await?;
                Ok(StageOutcome::Complete)
            }
            Some("metadata") => {
                self.enrich_metadata().await?;
                Ok(StageOutcome::Complete)
            }
            Some("summary") => {
                self.enrich_summaries().await?;
                Ok(StageOutcome::Complete)
            }

            Some(other) => Err(stage_err(format!("Unknown enrichment subtask: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config::default()
    }

    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    struct TestItem {
        id: String,
    }

    impl treadle::WorkItem for TestItem {
        fn id(&self) -> &str {
            &self.id
        }
    }

    #[test]
    fn test_enrich_stage_creation() {
        let stage = EnrichStage::new(&test_config());
        assert_eq!(stage.name(), "enrich");
    }

    #[test]
    fn test_enabled_sources_default() {
        let stage = EnrichStage::new(&test_config());
        let sources = stage.enabled_sources();
        // Lyrics and MusicBrainz need no credentials
        assert!(sources.contains(&"lyrics"));
        assert!(sources.contains(&"metadata"));
        // Summarization requires a configured sidecar
        assert!(!sources.contains(&"summary"));
    }

    #[test]
    fn test_enabled_sources_with_summarizer() {
        let mut config = test_config();
        config.summarizer_url = Some("http://127.0.0.1:8910".to_string());
        let stage = EnrichStage::new(&config);
        assert!(stage.enabled_sources().contains(&"summary"));
    }

    #[tokio::test]
    async fn test_enrich_stage_fan_out() {
        let stage = EnrichStage::new(&test_config());
        let item = TestItem {
            id: "batch-1".to_string(),
        };
        let mut ctx = StageContext::new("enrich".to_string());

        let outcome = stage.execute(&item, &mut ctx).await.unwrap();
        match outcome {
            StageOutcome::FanOut(subtasks) => {
                let ids: Vec<&str> = subtasks.iter().map(|s| s.id.as_str()).collect();
                assert!(ids.contains(&"lyrics"));
                assert!(ids.contains(&"metadata"));
            }
            _ => panic!("Expected FanOut outcome"),
        }
    }

    #[tokio::test]
    async fn test_enrich_stage_unknown_subtask() {
        let stage = EnrichStage::new(&test_config());
        let item = TestItem {
            id: "batch-1".to_string(),
        };
        let mut ctx = StageContext::new("enrich".to_string()).with_subtask("unknown_source");

        let result = stage.execute(&item, &mut ctx).await;
        assert!(result.is_err());
    }
}
