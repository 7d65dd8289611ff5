//! Lyric summarization client.
//!
//! Talks to a summarizer sidecar: `POST {base}/summarize` with
//! `{"text": "..."}` returning `{"summary": "..."}`. Like the lyrics
//! lookup, a failure degrades to `None`.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::EnrichResult;

#[derive(Serialize)]
struct SummarizeRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct SummarizeResponse {
    summary: String,
}

/// HTTP client for the lyric summarizer sidecar.
#[derive(Debug, Clone)]
pub struct SummaryClient {
    http: Client,
    base_url: String,
}

impl SummaryClient {
    /// Create a new summary client.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(base_url: impl Into<String>) -> EnrichResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent("resona/0.1.0 (https://github.com/oxur/resona)")
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    /// Summarize a lyrics text. `None` on failure or an empty result.
    pub async fn summarize(&self, lyrics: &str) -> Option<String> {
        let url = format!("{}/summarize", self.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .json(&SummarizeRequest { text: lyrics })
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                log::warn!("Summarizer call to {url} failed: {e}");
                return None;
            }
        };

        match response.json::<SummarizeResponse>().await {
            Ok(parsed) if parsed.summary.trim().is_empty() => None,
            Ok(parsed) => Some(parsed.summary.trim().to_string()),
            Err(e) => {
                log::warn!("Summarizer response from {url} unparseable: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        assert!(SummaryClient::new("http://127.0.0.1:8910").is_ok());
    }

    #[test]
    fn test_summarize_response_deserialize() {
        let parsed: SummarizeResponse =
            serde_json::from_str(r#"{"summary": "a song about rain"}"#).unwrap();
        assert_eq!(parsed.summary, "a song about rain");
    }
}
