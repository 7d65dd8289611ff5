use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use resona_etl::Config;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "resona", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the catalog database (default: ~/.local/share/resona/catalog.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Path to the vector store (default: ~/.local/share/resona/vectors.db)
    #[arg(long, global = true)]
    vectors: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Sync a metadata feed and audio directory into the catalog
    ///
    /// Matches every record in the feed against the audio files in the
    /// given directory, creates catalog rows for new matches, computes
    /// missing tempo estimates and audio embeddings, pushes tracks into
    /// the vector store, and runs the external enrichment pass (lyrics,
    /// MusicBrainz metadata, lyric summaries).
    ///
    /// The whole run is idempotent: records already cataloged, fields
    /// already computed, and vectors already stored are skipped, so
    /// re-running after a partial failure only does the remaining work.
    Sync {
        /// Path to the metadata feed (a JSON array of records)
        metadata: PathBuf,
        /// Path to the audio directory
        audio_dir: PathBuf,
    },
    /// Record a listening event for a user
    Listen {
        /// User id
        user: i64,
        /// Track id
        track: i64,
        /// Event kind: played_full, skip, or a custom label
        #[arg(default_value = "played_full")]
        kind: String,
    },
    /// Compute and store a user's taste fingerprint
    Fingerprint {
        /// User id
        user: i64,
    },
    /// Recommend tracks for a user
    Recommend {
        /// User id
        user: i64,
        /// Maximum number of recommendations
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Search the catalog with a free-text query
    Search {
        /// Query text
        query: String,
        /// Maximum number of results
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Split a track into vocal, drum, bass, and residual stems
    Deconstruct {
        /// Path to the audio file
        input: PathBuf,
        /// Output directory for the stems
        #[arg(long, default_value = "stems")]
        out: PathBuf,
    },
    /// Show catalog and vector store status
    Status,
    /// Show or initialize the configuration
    Config {
        /// Write a commented example config file if none exists
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load_with_overrides(cli.db, cli.vectors)?;

    // Ensure store directories exist
    for path in [&config.database_path, &config.vector_db_path] {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
    }

    match cli.command {
        Commands::Sync {
            metadata,
            audio_dir,
        } => {
            commands::run_sync(metadata, audio_dir, &config).await?;
        }
        Commands::Listen { user, track, kind } => {
            commands::record_listen(&config, user, track, &kind)?;
        }
        Commands::Fingerprint { user } => {
            commands::run_fingerprint(&config, user)?;
        }
        Commands::Recommend { user, limit } => {
            commands::run_recommend(&config, user, limit)?;
        }
        Commands::Search { query, limit } => {
            commands::run_search(&config, &query, limit).await?;
        }
        Commands::Deconstruct { input, out } => {
            commands::run_deconstruct(&config, input, out).await?;
        }
        Commands::Status => {
            commands::show_status(&config)?;
        }
        Commands::Config { init } => {
            commands::show_config(init)?;
        }
    }

    Ok(())
}
