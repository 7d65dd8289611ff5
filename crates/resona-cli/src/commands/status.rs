use anyhow::Result;

use resona_core::schema::CatalogDb;
use resona_etl::Config;
use resona_search::VectorStore;

pub fn show_status(config: &Config) -> Result<()> {
    let db = CatalogDb::open(&config.database_path)?;
    let vectors = VectorStore::open(&config.vector_db_path)?;

    let tracks = db.track_count()?;
    let embedded = db.embedded_track_count()?;
    let events = db.event_count()?;
    let profiles = db.profile_count()?;
    let vectorized = vectors.len()?;

    println!("\n📊 Resona Status\n");
    println!("  Catalog:  {}", config.database_path.display());
    println!("  Vectors:  {}", config.vector_db_path.display());
    println!();
    println!("  Tracks:          {tracks}");
    println!("  With embedding:  {embedded}");
    println!("  Vectorized:      {vectorized}");
    println!("  Events:          {events}");
    println!("  Taste profiles:  {profiles}");

    if embedded < tracks || vectorized < embedded {
        println!("\n  Run `resona sync` to finish processing the backlog");
    }

    Ok(())
}
