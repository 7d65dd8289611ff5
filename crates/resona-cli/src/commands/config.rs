use anyhow::Result;

use resona_etl::{config, Config};

/// Show the current effective configuration, optionally writing an
/// example config file first.
pub fn show_config(init: bool) -> Result<()> {
    if init {
        if config::ensure_config_file()? {
            println!("Created {}", config::config_file_path().display());
        } else {
            println!(
                "Config file already exists: {}",
                config::config_file_path().display()
            );
        }
    }

    let loaded = Config::load()?;

    println!("\nCurrent Configuration");
    println!("=====================\n");

    println!("Config file: {}", config::config_file_path().display());
    let exists = config::config_file_path().exists();
    println!(
        "File exists: {}\n",
        if exists { "yes" } else { "no (using defaults)" }
    );

    println!("Settings:");
    println!("  database_path: {}", loaded.database_path.display());
    println!("  vector_db_path: {}", loaded.vector_db_path.display());
    println!("  gateway_url: {}", loaded.gateway_url);
    println!("  lyrics_api_url: {}", loaded.lyrics_api_url);
    println!(
        "  summarizer_url: {}",
        loaded.summarizer_url.as_deref().unwrap_or("<not set>")
    );
    println!("  separator_program: {}", loaded.separator_program);

    println!("\nPriority: CLI args > ENV vars (RESONA_*) > Config file > Defaults");

    Ok(())
}
