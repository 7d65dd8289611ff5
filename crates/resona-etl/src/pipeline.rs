use std::path::PathBuf;
use std::sync::Arc;
use treadle::Workflow;

use crate::config::Config;
use crate::{CatalogStage, EnrichStage, VectorizeStage};
use resona_search::EmbeddingGateway;

/// Build the catalog → vectorize → enrich pipeline.
///
/// Vectorize and enrich both depend on the catalog stage; enrichment
/// additionally waits for vectorize so the metadata subtask finds the
/// vector records it annotates.
///
/// # Errors
/// Returns an error if the workflow cannot be built.
pub fn build_pipeline(
    metadata_path: PathBuf,
    audio_dir: PathBuf,
    config: &Config,
    gateway: Arc<dyn EmbeddingGateway>,
) -> treadle::Result<Workflow> {
    let catalog_stage = CatalogStage::new(
        metadata_path,
        audio_dir,
        config.database_path.clone(),
        gateway.clone(),
    );
    let vectorize_stage = VectorizeStage::new(
        config.database_path.clone(),
        config.vector_db_path.clone(),
        gateway,
    );
    let enrich_stage = EnrichStage::new(config);

    Workflow::builder()
        .stage("catalog", catalog_stage)
        .stage("vectorize", vectorize_stage)
        .stage("enrich", enrich_stage)
        .dependency("vectorize", "catalog")
        .dependency("enrich", "vectorize")
        .build()
}
