//! Catalog sync pipeline for resona.
//!
//! Implements the catalog, vectorize, and enrich stages as treadle
//! `Stage` implementations, plus the metadata matching and audio
//! analysis helpers they build on.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod audio;
pub mod catalog;
pub mod config;
pub mod enrich;
pub mod error;
pub mod matching;
pub mod pipeline;
pub mod separate;
pub mod vectorize;
pub mod work_item;

pub use catalog::CatalogStage;
pub use config::Config;
pub use enrich::stage::EnrichStage;
pub use error::{EnrichError, EnrichResult, SyncError, SyncResult};
pub use pipeline::build_pipeline;
pub use separate::{CommandSeparator, StemPaths, StemSeparator};
pub use vectorize::VectorizeStage;
pub use work_item::SyncBatch;
