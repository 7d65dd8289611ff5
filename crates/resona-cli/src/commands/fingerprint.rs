use anyhow::Result;

use resona_core::schema::CatalogDb;
use resona_etl::Config;
use resona_search::build_fingerprint;

pub fn run_fingerprint(config: &Config, user: i64) -> Result<()> {
    let db = CatalogDb::open(&config.database_path)?;

    match build_fingerprint(&db, user) {
        Ok(profile) => {
            let vector = profile.decode()?;
            println!(
                "✓ Taste fingerprint for user {user}: {} dimensions, updated {}",
                vector.len(),
                profile.updated_at.to_rfc3339()
            );
            Ok(())
        }
        Err(e) if e.is_no_signal() => {
            println!("No listening history to fingerprint yet: {e}");
            println!("  Record plays with `resona listen <user> <track>` first");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
