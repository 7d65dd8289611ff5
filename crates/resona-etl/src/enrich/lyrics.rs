//! Lyrics lookup client.
//!
//! Talks to a lyrics.ovh-compatible API: `GET {base}/{artist}/{title}`
//! returning `{"lyrics": "..."}`. A miss or a network failure is a
//! `None`, never an error; a track without lyrics is a normal state.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::error::EnrichResult;

#[derive(Debug, Deserialize)]
struct LyricsResponse {
    lyrics: String,
}

/// HTTP client for the lyrics lookup API.
#[derive(Debug, Clone)]
pub struct LyricsClient {
    http: Client,
    base_url: String,
}

impl LyricsClient {
    /// Create a new lyrics client.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(base_url: impl Into<String>) -> EnrichResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("resona/0.1.0 (https://github.com/oxur/resona)")
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    /// Look up lyrics for a track. `None` on miss or failure.
    pub async fn lookup(&self, artist: &str, title: &str) -> Option<String> {
        let mut url = match reqwest::Url::parse(&self.base_url) {
            Ok(url) => url,
            Err(e) => {
                log::warn!("Bad lyrics API base URL {:?}: {e}", self.base_url);
                return None;
            }
        };
        // Path segments get percent-encoded here; artist and title may
        // contain anything.
        url.path_segments_mut().ok()?.extend([artist, title]);

        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                log::debug!("No lyrics for {artist} - {title}: {e}");
                return None;
            }
        };

        match response.json::<LyricsResponse>().await {
            Ok(parsed) if parsed.lyrics.trim().is_empty() => None,
            Ok(parsed) => Some(clean_lyrics(&parsed.lyrics)),
            Err(e) => {
                log::warn!("Unparseable lyrics response for {artist} - {title}: {e}");
                None
            }
        }
    }
}

/// Strip provider boilerplate from fetched lyrics.
///
/// Some sources prepend a "<Title> Lyrics" header line and append an
/// "Embed" footer with a stray counter.
pub fn clean_lyrics(raw: &str) -> String {
    let mut text = raw.trim();

    if let Some(stripped) = text.strip_suffix("Embed") {
        text = stripped.trim_end_matches(|c: char| c.is_ascii_digit());
    }

    let mut lines = text.lines();
    let cleaned = match lines.next() {
        Some(first) if first.trim_end().ends_with("Lyrics") => {
            lines.collect::<Vec<_>>().join("\n")
        }
        _ => text.to_string(),
    };

    cleaned.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        assert!(LyricsClient::new("https://api.lyrics.ovh/v1").is_ok());
    }

    #[test]
    fn test_clean_lyrics_passthrough() {
        let raw = "First verse\nSecond verse";
        assert_eq!(clean_lyrics(raw), raw);
    }

    #[test]
    fn test_clean_lyrics_drops_header_line() {
        let raw = "Neon Nights Lyrics\nFirst verse\nSecond verse";
        assert_eq!(clean_lyrics(raw), "First verse\nSecond verse");
    }

    #[test]
    fn test_clean_lyrics_strips_embed_footer() {
        let raw = "First verse\nSecond verse42Embed";
        assert_eq!(clean_lyrics(raw), "First verse\nSecond verse");
    }

    #[test]
    fn test_lyrics_response_deserialize() {
        let parsed: LyricsResponse =
            serde_json::from_str(r#"{"lyrics": "la la la"}"#).unwrap();
        assert_eq!(parsed.lyrics, "la la la");
    }
}
