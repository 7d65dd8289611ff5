//! Metadata-to-asset matching.
//!
//! The metadata feed and the audio directory use different naming
//! conventions, so both sides are reduced to a lowercase alphanumeric
//! form before comparison. An asset matches a record when its
//! normalized file stem contains both the normalized title and the
//! normalized primary artist. Assets are scanned in sorted path order
//! and the first match wins, so repeated runs resolve identically.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{SyncError, SyncResult};

/// One record from the metadata feed (a JSON array of objects).
///
/// Records missing a title or artist cannot be matched and are skipped
/// by the catalog stage.
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataRecord {
    pub title: Option<String>,
    pub artist: Option<String>,
    /// Feed fields with no catalog column; preserved for logging only.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// An audio file discovered under the sync directory.
#[derive(Debug, Clone)]
pub struct AudioAsset {
    pub path: PathBuf,
    normalized_stem: String,
}

/// Lowercase and strip everything that is not an ASCII letter or digit.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

/// The first credited artist: the segment before any `,`, `&`, or
/// `ft.` separator.
pub fn primary_artist(artist: &str) -> &str {
    let mut end = artist.len();
    for separator in [",", "&", "ft."] {
        if let Some(index) = artist.find(separator) {
            end = end.min(index);
        }
    }
    artist[..end].trim()
}

/// Parse the metadata feed.
pub fn load_metadata(path: &Path) -> SyncResult<Vec<MetadataRecord>> {
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| SyncError::Metadata {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn is_audio_file(path: &Path) -> bool {
    if let Some(ext) = path.extension() {
        matches!(
            ext.to_string_lossy().to_lowercase().as_ref(),
            "flac" | "mp3" | "ogg" | "oga" | "wav" | "m4a" | "aac"
        )
    } else {
        false
    }
}

/// Walk the audio directory and collect assets in sorted path order.
pub fn list_audio_assets(dir: &Path) -> SyncResult<Vec<AudioAsset>> {
    let mut assets = Vec::new();
    for entry in WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if !path.is_file() || !is_audio_file(path) {
            continue;
        }
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        assets.push(AudioAsset {
            path: path.to_path_buf(),
            normalized_stem: normalize(&stem),
        });
    }
    assets.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(assets)
}

/// Find the first asset whose normalized stem contains both the
/// normalized title and the normalized primary artist.
///
/// Both inputs must already be normalized and non-empty.
pub fn find_match<'a>(
    normalized_title: &str,
    normalized_artist: &str,
    assets: &'a [AudioAsset],
) -> Option<&'a AudioAsset> {
    assets.iter().find(|asset| {
        asset.normalized_stem.contains(normalized_title)
            && asset.normalized_stem.contains(normalized_artist)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_strips_punctuation_and_case() {
        assert_eq!(normalize("Hey, Jude!"), "heyjude");
        assert_eq!(normalize("  Track #1 (Live) "), "track1live");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_normalize_drops_non_ascii() {
        assert_eq!(normalize("Señorita"), "seorita");
    }

    #[test]
    fn test_primary_artist_takes_first_segment() {
        assert_eq!(primary_artist("Aurora"), "Aurora");
        assert_eq!(primary_artist("Aurora, Kygo"), "Aurora");
        assert_eq!(primary_artist("Simon & Garfunkel"), "Simon");
        assert_eq!(primary_artist("Rihanna ft. Jay-Z"), "Rihanna");
    }

    #[test]
    fn test_primary_artist_leaves_embedded_ft_alone() {
        // "ft" without the trailing dot is not a separator.
        assert_eq!(primary_artist("Daft Punk"), "Daft Punk");
    }

    fn touch(dir: &Path, name: &str) {
        File::create(dir.join(name)).unwrap();
    }

    #[test]
    fn test_list_audio_assets_filters_and_sorts() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "b_song.mp3");
        touch(tmp.path(), "a_song.flac");
        touch(tmp.path(), "notes.txt");

        let assets = list_audio_assets(tmp.path()).unwrap();
        assert_eq!(assets.len(), 2);
        assert!(assets[0].path.ends_with("a_song.flac"));
        assert!(assets[1].path.ends_with("b_song.mp3"));
    }

    #[test]
    fn test_find_match_requires_both_substrings() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "aurora_neon_nights.mp3");
        touch(tmp.path(), "someone_neon_nights.mp3");
        let assets = list_audio_assets(tmp.path()).unwrap();

        let hit = find_match("neonnights", "aurora", &assets).unwrap();
        assert!(hit.path.ends_with("aurora_neon_nights.mp3"));

        assert!(find_match("neonnights", "kygo", &assets).is_none());
    }

    #[test]
    fn test_find_match_first_in_sorted_order_wins() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "z_aurora_echo.mp3");
        touch(tmp.path(), "a_aurora_echo.mp3");
        let assets = list_audio_assets(tmp.path()).unwrap();

        let hit = find_match("echo", "aurora", &assets).unwrap();
        assert!(hit.path.ends_with("a_aurora_echo.mp3"));
    }

    #[test]
    fn test_load_metadata_rejects_malformed_feed() {
        let tmp = TempDir::new().unwrap();
        let feed = tmp.path().join("feed.json");
        fs::write(&feed, "{not json").unwrap();
        assert!(matches!(
            load_metadata(&feed),
            Err(SyncError::Metadata { .. })
        ));
    }

    #[test]
    fn test_load_metadata_keeps_extra_fields() {
        let tmp = TempDir::new().unwrap();
        let feed = tmp.path().join("feed.json");
        fs::write(
            &feed,
            r#"[{"title": "Echo", "artist": "Aurora", "album": "X"}]"#,
        )
        .unwrap();

        let records = load_metadata(&feed).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title.as_deref(), Some("Echo"));
        assert_eq!(records[0].extra["album"], "X");
    }
}
