use anyhow::Result;

use resona_core::schema::CatalogDb;
use resona_etl::Config;
use resona_search::{search, EngineError, HttpEmbeddingGateway, VectorStore};

pub async fn run_search(config: &Config, query: &str, limit: usize) -> Result<()> {
    let db = CatalogDb::open(&config.database_path)?;
    let vectors = VectorStore::open(&config.vector_db_path)?;
    let gateway = HttpEmbeddingGateway::new(config.gateway_url.clone());

    let tracks = match search(&db, &vectors, &gateway, query, limit).await {
        Ok(tracks) => tracks,
        Err(EngineError::InvalidQuery(message)) => {
            anyhow::bail!("Invalid query: {message}");
        }
        Err(e) => return Err(e.into()),
    };

    if tracks.is_empty() {
        println!("No results for {query:?}");
        return Ok(());
    }

    println!("\n🔍 Results for {query:?}\n");
    for (rank, track) in tracks.iter().enumerate() {
        println!(
            "  {:>2}. {} - {}  [{}]",
            rank + 1,
            track.title,
            track.artist,
            track.id
        );
    }
    Ok(())
}
