use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use resona_etl::{build_pipeline, Config, SyncBatch};
use resona_search::HttpEmbeddingGateway;

pub async fn run_sync(metadata: PathBuf, audio_dir: PathBuf, config: &Config) -> Result<()> {
    tracing::info!(
        "Starting sync of {} against {}",
        metadata.display(),
        audio_dir.display()
    );

    let gateway = Arc::new(HttpEmbeddingGateway::new(config.gateway_url.clone()));
    let workflow = build_pipeline(metadata.clone(), audio_dir.clone(), config, gateway)?;

    // Pipeline state lives next to the catalog so interrupted runs resume.
    let state_path = config
        .database_path
        .parent()
        .map(|dir| dir.join("pipeline.db"))
        .unwrap_or_else(|| PathBuf::from("pipeline.db"));
    let mut store = treadle::SqliteStateStore::open(&state_path).await?;

    let batch = SyncBatch::new("sync-job", metadata, audio_dir);

    // Subscribe to events for progress display
    let mut events = workflow.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                treadle::WorkflowEvent::StageStarted { stage, .. } => {
                    println!("  ⏳ [{stage}] Starting...");
                }
                treadle::WorkflowEvent::StageCompleted { stage, .. } => {
                    println!("  ✓ [{stage}] Complete");
                }
                treadle::WorkflowEvent::StageFailed { stage, error, .. } => {
                    eprintln!("  ✗ [{stage}] FAILED: {error}");
                }
                _ => {}
            }
        }
    });

    workflow.advance(&batch, &mut store).await?;

    println!("\n✓ Sync complete");
    Ok(())
}
