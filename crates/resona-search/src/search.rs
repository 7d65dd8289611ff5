//! Semantic search resolver.
//!
//! Routes a free-text query through the embedding gateway, asks the
//! vector store for the nearest neighbors, and hydrates full track
//! records from the catalog in exactly the neighbor order.

use std::collections::HashMap;

use resona_core::model::Track;
use resona_core::schema::CatalogDb;

use crate::error::{EngineError, EngineResult};
use crate::gateway::EmbeddingGateway;
use crate::vector_store::VectorStore;

/// Return up to `limit` tracks ranked by relevance to a text query.
///
/// # Errors
/// [`EngineError::InvalidQuery`] for an empty or whitespace-only query
/// (the gateway is never called in that case). A gateway failure is
/// logged and degrades to an empty result, not an error.
pub async fn search(
    catalog: &CatalogDb,
    vectors: &VectorStore,
    gateway: &dyn EmbeddingGateway,
    query: &str,
    limit: usize,
) -> EngineResult<Vec<Track>> {
    if query.trim().is_empty() {
        return Err(EngineError::InvalidQuery(
            "query text must not be empty".to_string(),
        ));
    }

    log::info!("Semantic search: {query:?}");

    let Some(query_vector) = gateway.embed_text(query).await else {
        log::warn!("Embedding gateway returned no vector for query; returning empty result");
        return Ok(Vec::new());
    };

    let neighbors = vectors.query(&query_vector, limit)?;
    if neighbors.is_empty() {
        log::debug!("Vector store returned no neighbors");
        return Ok(Vec::new());
    }

    // Vector store ids are catalog track ids rendered as strings.
    let mut neighbor_ids: Vec<i64> = Vec::with_capacity(neighbors.len());
    for neighbor in &neighbors {
        match neighbor.id.parse::<i64>() {
            Ok(id) => neighbor_ids.push(id),
            Err(_) => log::warn!("Ignoring non-numeric vector id {:?}", neighbor.id),
        }
    }

    let rank: HashMap<i64, usize> = neighbor_ids
        .iter()
        .enumerate()
        .map(|(index, id)| (*id, index))
        .collect();

    // Catalog fetch order is unspecified and must not be trusted;
    // re-sort hydrated rows into the neighbor order.
    let mut tracks = catalog.get_tracks_by_ids(&neighbor_ids)?;
    if tracks.len() < neighbor_ids.len() {
        log::warn!(
            "Vector store referenced {} ids but the catalog resolved {}",
            neighbor_ids.len(),
            tracks.len()
        );
    }
    tracks.sort_by_key(|track| rank.get(&track.id).copied().unwrap_or(usize::MAX));
    Ok(tracks)
}
