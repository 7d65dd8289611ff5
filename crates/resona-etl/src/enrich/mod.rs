//! External enrichment clients and the fan-out enrichment stage.

pub mod lyrics;
pub mod musicbrainz;
pub mod resilience;
pub mod stage;
pub mod summary;
