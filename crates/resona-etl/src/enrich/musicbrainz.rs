//! MusicBrainz recording search client.
//!
//! Resolves an artist/title pair to a MusicBrainz recording and
//! extracts release year and genre tags from the best hit. Hits at or
//! below the confidence floor are treated as misses: wrong metadata is
//! worse than none.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::error::EnrichResult;

/// Search hits below this score are discarded.
const MIN_MATCH_SCORE: i64 = 90;

#[derive(Debug, Deserialize)]
struct RecordingSearchResponse {
    #[serde(default)]
    recordings: Vec<MbRecording>,
}

/// A recording from the MusicBrainz search endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct MbRecording {
    pub id: String,
    pub title: String,
    pub score: Option<i64>,
    #[serde(rename = "first-release-date")]
    pub first_release_date: Option<String>,
    #[serde(default)]
    pub tags: Vec<MbTag>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MbTag {
    pub name: String,
}

impl MbRecording {
    /// The release year, parsed from the date prefix.
    #[must_use]
    pub fn release_year(&self) -> Option<i64> {
        self.first_release_date
            .as_deref()
            .and_then(|date| date.get(..4))
            .and_then(|year| year.parse().ok())
    }

    /// Genre tag names attached to the recording.
    #[must_use]
    pub fn tag_names(&self) -> Vec<String> {
        self.tags.iter().map(|tag| tag.name.clone()).collect()
    }
}

/// MusicBrainz API client.
#[derive(Debug, Clone)]
pub struct MusicBrainzClient {
    http: Client,
}

impl MusicBrainzClient {
    /// Create a new MusicBrainz client.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> EnrichResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("resona/0.1.0 (https://github.com/oxur/resona)")
            .build()?;
        Ok(Self { http })
    }

    /// Search for a recording by artist and title.
    ///
    /// Returns the first hit scoring above [`MIN_MATCH_SCORE`], or
    /// `None` when nothing matches confidently.
    ///
    /// Rate limit: 1 request/second (enforced by caller).
    ///
    /// # Errors
    /// Returns an error if the API request fails or the response cannot
    /// be parsed.
    pub async fn search_recording(
        &self,
        artist: &str,
        title: &str,
    ) -> EnrichResult<Option<MbRecording>> {
        let query = format!("artist:\"{artist}\" AND recording:\"{title}\"");
        let response = self
            .http
            .get("https://musicbrainz.org/ws/2/recording")
            .query(&[("query", query.as_str()), ("fmt", "json"), ("limit", "5")])
            .send()
            .await?
            .error_for_status()?;

        let parsed = response.json::<RecordingSearchResponse>().await?;
        Ok(parsed
            .recordings
            .into_iter()
            .find(|recording| recording.score.unwrap_or(0) > MIN_MATCH_SCORE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        assert!(MusicBrainzClient::new().is_ok());
    }

    #[test]
    fn test_release_year_from_date_prefix() {
        let recording: MbRecording = serde_json::from_str(
            r#"{"id": "x", "title": "Echo", "score": 100,
                "first-release-date": "1997-05-21"}"#,
        )
        .unwrap();
        assert_eq!(recording.release_year(), Some(1997));
    }

    #[test]
    fn test_release_year_absent() {
        let recording: MbRecording =
            serde_json::from_str(r#"{"id": "x", "title": "Echo"}"#).unwrap();
        assert_eq!(recording.release_year(), None);
        assert!(recording.tag_names().is_empty());
    }

    #[test]
    fn test_search_response_deserialize() {
        let parsed: RecordingSearchResponse = serde_json::from_str(
            r#"{"recordings": [
                {"id": "a", "title": "Echo", "score": 97,
                 "tags": [{"name": "electronic", "count": 3}]},
                {"id": "b", "title": "Echo (live)", "score": 60}
            ]}"#,
        )
        .unwrap();
        assert_eq!(parsed.recordings.len(), 2);
        assert_eq!(parsed.recordings[0].tag_names(), vec!["electronic"]);
    }

    #[test]
    fn test_low_scores_filtered_like_search() {
        let recordings = vec![
            MbRecording {
                id: "a".into(),
                title: "Echo".into(),
                score: Some(85),
                first_release_date: None,
                tags: Vec::new(),
            },
            MbRecording {
                id: "b".into(),
                title: "Echo".into(),
                score: Some(95),
                first_release_date: None,
                tags: Vec::new(),
            },
        ];
        let hit = recordings
            .into_iter()
            .find(|r| r.score.unwrap_or(0) > MIN_MATCH_SCORE)
            .unwrap();
        assert_eq!(hit.id, "b");
    }
}
