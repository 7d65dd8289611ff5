//! Taste fingerprint builder.
//!
//! A user's fingerprint is the element-wise mean of the cached
//! embeddings of every track they have fully played. Recomputation is
//! deterministic given the same inputs, and the persist step is a
//! single atomic upsert: a failure there leaves the previous profile
//! row untouched.

use resona_core::embedding;
use resona_core::model::TasteProfile;
use resona_core::schema::CatalogDb;

use crate::error::{EngineError, EngineResult};

/// Compute and persist the taste profile for a user.
///
/// # Errors
/// [`EngineError::NoHistory`] when the user has no played-full events;
/// [`EngineError::NoEmbeddedHistory`] when none of the played tracks
/// has a usable cached embedding. Both are no-signal outcomes, not
/// faults. Malformed embedding rows are skipped with a warning.
pub fn build_fingerprint(catalog: &CatalogDb, user_id: i64) -> EngineResult<TasteProfile> {
    log::info!("Building taste fingerprint for user {user_id}");

    let played = catalog.played_track_ids(user_id)?;
    if played.is_empty() {
        return Err(EngineError::NoHistory { user_id });
    }
    log::debug!("User {user_id} has {} played tracks", played.len());

    let rows = catalog.embeddings_for(&played)?;
    if rows.is_empty() {
        return Err(EngineError::NoEmbeddedHistory { user_id });
    }

    // Decode row by row; a bad blob or a dimension mismatch poisons
    // that row only. The first valid vector fixes the reference
    // dimension for the rest.
    let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(rows.len());
    let mut reference_dim: Option<usize> = None;
    for (track_id, blob) in &rows {
        let vector = match embedding::from_bytes(blob) {
            Ok(vector) => vector,
            Err(e) => {
                log::warn!("Skipping track {track_id} in fingerprint: {e}");
                continue;
            }
        };
        match reference_dim {
            None => reference_dim = Some(vector.len()),
            Some(dim) if vector.len() != dim => {
                log::warn!(
                    "Skipping track {track_id} in fingerprint: dimension {} != {dim}",
                    vector.len()
                );
                continue;
            }
            Some(_) => {}
        }
        vectors.push(vector);
    }

    let Some(profile_vector) = embedding::mean(&vectors) else {
        return Err(EngineError::NoEmbeddedHistory { user_id });
    };
    log::info!(
        "Fingerprint for user {user_id}: {} source vectors, dimension {}",
        vectors.len(),
        profile_vector.len()
    );

    // Persist last, atomically; see CatalogDb::upsert_profile.
    let bytes = embedding::to_bytes(&profile_vector);
    catalog.upsert_profile(user_id, &bytes)?;

    catalog
        .get_profile(user_id)?
        .ok_or(resona_core::Error::NotFound {
            entity: "taste_profile",
            id: user_id.to_string(),
        })
        .map_err(EngineError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use resona_core::model::{EventKind, NewTrack};
    use std::path::PathBuf;

    fn seed_track(db: &CatalogDb, path: &str, vector: Option<&[f32]>) -> i64 {
        let track = db
            .insert_track(&NewTrack::new(PathBuf::from(path), "Title", "Artist"))
            .unwrap();
        if let Some(vector) = vector {
            db.set_embedding(track.id, &embedding::to_bytes(vector))
                .unwrap();
        }
        track.id
    }

    #[test]
    fn test_fingerprint_is_mean_of_played_embeddings() {
        let db = CatalogDb::open_in_memory().unwrap();
        let a = seed_track(&db, "/music/a.mp3", Some(&[1.0, 0.0]));
        let b = seed_track(&db, "/music/b.mp3", Some(&[0.0, 1.0]));

        db.record_event(7, a, &EventKind::PlayedFull).unwrap();
        db.record_event(7, b, &EventKind::PlayedFull).unwrap();

        let profile = build_fingerprint(&db, 7).unwrap();
        assert_eq!(profile.user_id, 7);
        assert_eq!(profile.decode().unwrap(), vec![0.5, 0.5]);
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let db = CatalogDb::open_in_memory().unwrap();
        let a = seed_track(&db, "/music/a.mp3", Some(&[0.25, 0.75, -0.5]));
        db.record_event(7, a, &EventKind::PlayedFull).unwrap();

        let first = build_fingerprint(&db, 7).unwrap();
        let second = build_fingerprint(&db, 7).unwrap();
        assert_eq!(first.vector, second.vector);
    }

    #[test]
    fn test_skips_and_other_events_do_not_count() {
        let db = CatalogDb::open_in_memory().unwrap();
        let a = seed_track(&db, "/music/a.mp3", Some(&[1.0, 0.0]));
        db.record_event(7, a, &EventKind::Skip).unwrap();

        let result = build_fingerprint(&db, 7);
        assert!(matches!(result, Err(EngineError::NoHistory { user_id: 7 })));
    }

    #[test]
    fn test_no_history_for_unknown_user() {
        let db = CatalogDb::open_in_memory().unwrap();
        let result = build_fingerprint(&db, 99);
        assert!(matches!(result, Err(EngineError::NoHistory { .. })));
        assert!(result.unwrap_err().is_no_signal());
    }

    #[test]
    fn test_no_embedded_history() {
        let db = CatalogDb::open_in_memory().unwrap();
        let a = seed_track(&db, "/music/a.mp3", None);
        db.record_event(7, a, &EventKind::PlayedFull).unwrap();

        let result = build_fingerprint(&db, 7);
        assert!(matches!(result, Err(EngineError::NoEmbeddedHistory { .. })));
    }

    #[test]
    fn test_malformed_row_is_skipped_not_fatal() {
        let db = CatalogDb::open_in_memory().unwrap();
        let good = seed_track(&db, "/music/a.mp3", Some(&[1.0, 0.0]));
        let bad = db
            .insert_track(&NewTrack::new(PathBuf::from("/music/b.mp3"), "B", "Artist"))
            .unwrap()
            .id;
        // Three bytes: not a valid f32 buffer.
        db.set_embedding(bad, &[1, 2, 3]).unwrap();

        db.record_event(7, good, &EventKind::PlayedFull).unwrap();
        db.record_event(7, bad, &EventKind::PlayedFull).unwrap();

        let profile = build_fingerprint(&db, 7).unwrap();
        assert_eq!(profile.decode().unwrap(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_dimension_mismatch_row_is_skipped() {
        let db = CatalogDb::open_in_memory().unwrap();
        let a = seed_track(&db, "/music/a.mp3", Some(&[1.0, 0.0]));
        let b = seed_track(&db, "/music/b.mp3", Some(&[1.0, 0.0, 0.0]));

        db.record_event(7, a, &EventKind::PlayedFull).unwrap();
        db.record_event(7, b, &EventKind::PlayedFull).unwrap();

        let profile = build_fingerprint(&db, 7).unwrap();
        // First valid row (lowest track id) sets the dimension.
        assert_eq!(profile.decode().unwrap(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_recomputation_overwrites_profile() {
        let db = CatalogDb::open_in_memory().unwrap();
        let a = seed_track(&db, "/music/a.mp3", Some(&[1.0, 0.0]));
        let b = seed_track(&db, "/music/b.mp3", Some(&[0.0, 1.0]));

        db.record_event(7, a, &EventKind::PlayedFull).unwrap();
        build_fingerprint(&db, 7).unwrap();
        assert_eq!(
            db.get_profile(7).unwrap().unwrap().decode().unwrap(),
            vec![1.0, 0.0]
        );

        db.record_event(7, b, &EventKind::PlayedFull).unwrap();
        build_fingerprint(&db, 7).unwrap();
        assert_eq!(
            db.get_profile(7).unwrap().unwrap().decode().unwrap(),
            vec![0.5, 0.5]
        );
        assert_eq!(db.profile_count().unwrap(), 1);
    }
}
