//! Similarity-ranked recommender.
//!
//! Ranks every embedded catalog track the user has not interacted with
//! against the user's taste profile. Runs entirely in-process against
//! the catalog store; the vector store is not involved.

use std::cmp::Ordering;
use std::collections::HashMap;

use resona_core::embedding;
use resona_core::model::Track;
use resona_core::schema::CatalogDb;

use crate::error::EngineResult;

/// Return up to `limit` tracks ranked by predicted affinity for a user.
///
/// A user without a computed taste profile gets an empty list, not an
/// error: callers distinguish "no recommendations yet" from a fault.
/// Tracks with any listening event (played or skipped) are excluded.
/// Results are sorted by descending cosine similarity, ties broken by
/// ascending track id.
pub fn recommend(catalog: &CatalogDb, user_id: i64, limit: usize) -> EngineResult<Vec<Track>> {
    let Some(profile) = catalog.get_profile(user_id)? else {
        log::debug!("No taste profile for user {user_id}; nothing to recommend");
        return Ok(Vec::new());
    };
    let profile_vector = profile.decode()?;

    let exclude = catalog.event_track_ids(user_id)?.into_iter().collect();
    let candidates = catalog.candidate_embeddings(&exclude)?;
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let mut scored: Vec<(i64, f32)> = Vec::with_capacity(candidates.len());
    for (track_id, blob) in &candidates {
        let vector = match embedding::from_bytes(blob) {
            Ok(vector) => vector,
            Err(e) => {
                log::warn!("Skipping candidate track {track_id}: {e}");
                continue;
            }
        };
        if vector.len() != profile_vector.len() {
            log::warn!(
                "Skipping candidate track {track_id}: dimension {} != profile {}",
                vector.len(),
                profile_vector.len()
            );
            continue;
        }
        scored.push((*track_id, embedding::cosine_similarity(&vector, &profile_vector)));
    }

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    scored.truncate(limit);

    let ranked_ids: Vec<i64> = scored.iter().map(|(id, _)| *id).collect();
    let rank: HashMap<i64, usize> = ranked_ids
        .iter()
        .enumerate()
        .map(|(index, id)| (*id, index))
        .collect();

    // The store hands rows back in its own order; re-sort into the
    // computed rank order explicitly.
    let mut tracks = catalog.get_tracks_by_ids(&ranked_ids)?;
    tracks.sort_by_key(|track| rank.get(&track.id).copied().unwrap_or(usize::MAX));
    Ok(tracks)
}
