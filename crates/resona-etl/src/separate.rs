//! Stem separation boundary.
//!
//! Splits a track into vocal, drum, bass, and residual stems by
//! shelling out to an external separator (demucs by default). The
//! model is heavyweight and runs out of process; this module owns the
//! contract, not the model.

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;

const SUPPORTED_EXTENSIONS: &[&str] = &["flac", "mp3", "ogg", "oga", "wav", "m4a", "aac"];

const STEM_NAMES: [&str; 4] = ["vocals", "drums", "bass", "other"];

/// Errors raised during stem separation.
#[derive(Debug, Error)]
pub enum SeparationError {
    #[error("unsupported audio format: {extension:?}")]
    UnsupportedFormat { extension: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("separator exited with {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },

    #[error("separator produced no {name} stem")]
    MissingStem { name: &'static str },
}

/// Paths to the four separated stems of one track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StemPaths {
    pub vocals: PathBuf,
    pub drums: PathBuf,
    pub bass: PathBuf,
    pub other: PathBuf,
}

/// Splits one audio file into instrument stems.
///
/// Handles are explicitly owned (`Arc<dyn StemSeparator>`) so tests
/// and callers without the external model can substitute a double.
#[async_trait::async_trait]
pub trait StemSeparator: Send + Sync + fmt::Debug {
    /// Separate `input` into stems under `output_dir`.
    async fn separate(&self, input: &Path, output_dir: &Path)
        -> Result<StemPaths, SeparationError>;
}

/// Separator that invokes an external program as
/// `<program> <input> <output_dir>` and expects
/// `<output_dir>/{vocals,drums,bass,other}.wav` afterwards.
#[derive(Debug, Clone)]
pub struct CommandSeparator {
    program: String,
}

impl CommandSeparator {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn check_format(input: &Path) -> Result<(), SeparationError> {
        let extension = input
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
            Ok(())
        } else {
            Err(SeparationError::UnsupportedFormat { extension })
        }
    }
}

#[async_trait::async_trait]
impl StemSeparator for CommandSeparator {
    async fn separate(
        &self,
        input: &Path,
        output_dir: &Path,
    ) -> Result<StemPaths, SeparationError> {
        Self::check_format(input)?;
        std::fs::create_dir_all(output_dir)?;

        log::info!(
            "Separating {} with {} into {}",
            input.display(),
            self.program,
            output_dir.display()
        );
        let output = Command::new(&self.program)
            .arg(input)
            .arg(output_dir)
            .output()
            .await?;

        if !output.status.success() {
            return Err(SeparationError::CommandFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let stem = |name: &'static str| -> Result<PathBuf, SeparationError> {
            let path = output_dir.join(format!("{name}.wav"));
            if path.is_file() {
                Ok(path)
            } else {
                Err(SeparationError::MissingStem { name })
            }
        };

        Ok(StemPaths {
            vocals: stem(STEM_NAMES[0])?,
            drums: stem(STEM_NAMES[1])?,
            bass: stem(STEM_NAMES[2])?,
            other: stem(STEM_NAMES[3])?,
        })
    }
}
