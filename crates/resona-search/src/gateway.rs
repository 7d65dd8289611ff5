//! The embedding-gateway collaborator boundary.
//!
//! The gateway maps audio files or free text into fixed-dimension float
//! vectors. The model itself is external; this module defines the
//! narrow contract the engines consume and an HTTP client for a sidecar
//! model service. Failure is a `None` sentinel, logged and never
//! retried here: a failed embedding call degrades to an empty or
//! partial result, never a hang.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Maps audio or text to a fixed-dimension embedding vector.
///
/// Handles are explicitly owned (`Arc<dyn EmbeddingGateway>`) and passed
/// into each component, so tests can substitute a double.
#[async_trait::async_trait]
pub trait EmbeddingGateway: Send + Sync + fmt::Debug {
    /// Embed free text. `None` means the gateway failed.
    async fn embed_text(&self, text: &str) -> Option<Vec<f32>>;

    /// Embed an audio file by path. `None` means the gateway failed.
    async fn embed_audio(&self, path: &Path) -> Option<Vec<f32>>;
}

#[derive(Serialize)]
struct TextRequest<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct AudioRequest<'a> {
    path: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// HTTP client for an embedding model served as a sidecar process.
///
/// Expects `POST {base}/embed/text` and `POST {base}/embed/audio`
/// endpoints returning `{"embedding": [..]}`. The request timeout is
/// the cancellation boundary for the one slow external call in the
/// serving path.
#[derive(Debug, Clone)]
pub struct HttpEmbeddingGateway {
    http: Client,
    base_url: String,
}

impl HttpEmbeddingGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::builder()
                .user_agent("resona/0.1.0 (https://github.com/oxur/resona)")
                .timeout(Duration::from_secs(60))
                .build()
                .expect("failed to build HTTP client"),
            base_url: base_url.into(),
        }
    }

    async fn post_embed<T: Serialize>(&self, endpoint: &str, body: &T) -> Option<Vec<f32>> {
        let url = format!("{}/{endpoint}", self.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                log::warn!("Embedding gateway call to {url} failed: {e}");
                return None;
            }
        };

        match response.json::<EmbedResponse>().await {
            Ok(parsed) if parsed.embedding.is_empty() => {
                log::warn!("Embedding gateway at {url} returned an empty vector");
                None
            }
            Ok(parsed) => Some(parsed.embedding),
            Err(e) => {
                log::warn!("Embedding gateway response from {url} unparseable: {e}");
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingGateway for HttpEmbeddingGateway {
    async fn embed_text(&self, text: &str) -> Option<Vec<f32>> {
        self.post_embed("embed/text", &TextRequest { text }).await
    }

    async fn embed_audio(&self, path: &Path) -> Option<Vec<f32>> {
        let path = path.to_string_lossy();
        self.post_embed("embed/audio", &AudioRequest { path: &path })
            .await
    }
}
