use anyhow::Result;

use resona_core::model::EventKind;
use resona_core::schema::CatalogDb;
use resona_etl::Config;

pub fn record_listen(config: &Config, user: i64, track: i64, kind: &str) -> Result<()> {
    let db = CatalogDb::open(&config.database_path)?;
    let kind = EventKind::parse(kind);

    let event = db.record_event(user, track, &kind)?;
    println!(
        "✓ Recorded {} for user {} on track {}",
        kind.as_str(),
        user,
        track
    );
    log::debug!("Event id {}", event.id);

    if kind.is_positive() {
        println!("  Run `resona fingerprint {user}` to refresh the taste profile");
    }
    Ok(())
}
