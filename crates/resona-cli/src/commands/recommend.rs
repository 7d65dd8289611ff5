use anyhow::Result;

use resona_core::schema::CatalogDb;
use resona_etl::Config;
use resona_search::recommend;

pub fn run_recommend(config: &Config, user: i64, limit: usize) -> Result<()> {
    let db = CatalogDb::open(&config.database_path)?;

    let tracks = recommend(&db, user, limit)?;
    if tracks.is_empty() {
        println!("No recommendations for user {user}");
        println!("  Build a profile first: `resona fingerprint {user}`");
        return Ok(());
    }

    println!("\n🎵 Recommendations for user {user}\n");
    for (rank, track) in tracks.iter().enumerate() {
        let tempo = track
            .tempo_bpm
            .map(|bpm| format!(" ({bpm:.0} bpm)"))
            .unwrap_or_default();
        println!(
            "  {:>2}. {} - {}{tempo}  [{}]",
            rank + 1,
            track.title,
            track.artist,
            track.id
        );
    }
    Ok(())
}
