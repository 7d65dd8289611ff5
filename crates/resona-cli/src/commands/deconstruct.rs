use anyhow::Result;
use std::path::PathBuf;

use resona_etl::{CommandSeparator, Config, StemSeparator};

pub async fn run_deconstruct(config: &Config, input: PathBuf, out: PathBuf) -> Result<()> {
    let separator = CommandSeparator::new(config.separator_program.clone());

    println!("Deconstructing {} ...", input.display());
    let stems = separator.separate(&input, &out).await?;

    println!("\n✓ Stems written to {}", out.display());
    println!("  vocals: {}", stems.vocals.display());
    println!("  drums:  {}", stems.drums.display());
    println!("  bass:   {}", stems.bass.display());
    println!("  other:  {}", stems.other.display());
    Ok(())
}
