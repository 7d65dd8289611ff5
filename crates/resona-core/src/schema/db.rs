use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::model::{EventKind, ListeningEvent, NewTrack, TasteProfile, Track};

use super::migrations::MIGRATIONS;

const TRACK_COLUMNS: &str = "id, file_path, title, artist, tempo_bpm, key_signature, \
     lyrics, lyric_summary, embedding, created_at, updated_at";

/// The relational catalog store: tracks, listening events, and taste
/// profiles in a single SQLite database.
#[derive(Debug)]
pub struct CatalogDb {
    conn: Connection,
}

impl CatalogDb {
    /// Open (or create) a catalog at the given path and apply migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// Open an in-memory catalog (for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// Get a reference to the underlying connection (for advanced queries).
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    fn apply_migrations(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;

        let mut stmt = self
            .conn
            .prepare("SELECT version FROM schema_migrations ORDER BY version")?;
        let applied: Vec<u32> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for migration in MIGRATIONS {
            if !applied.contains(&migration.version) {
                log::info!(
                    "Applying migration {} ({})",
                    migration.version,
                    migration.name
                );
                self.conn.execute_batch(migration.sql)?;
                self.conn.execute(
                    "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
                    rusqlite::params![migration.version, migration.name],
                )?;
            }
        }

        Ok(())
    }
}

// Track CRUD
impl CatalogDb {
    /// Insert a new track and return it with its assigned id.
    ///
    /// A duplicate `file_path` surfaces as [`Error::Conflict`] so the
    /// sync pipeline can skip-and-continue.
    pub fn insert_track(&self, new: &NewTrack) -> Result<Track> {
        let now = Utc::now();
        let result = self.conn.execute(
            "INSERT INTO tracks (file_path, title, artist, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                new.file_path.to_string_lossy().as_ref(),
                new.title,
                new.artist,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(Error::Conflict {
                    entity: "track",
                    key: new.file_path.to_string_lossy().into_owned(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        let id = self.conn.last_insert_rowid();
        Ok(Track {
            id,
            file_path: new.file_path.clone(),
            title: new.title.clone(),
            artist: new.artist.clone(),
            tempo_bpm: None,
            key_signature: None,
            lyrics: None,
            lyric_summary: None,
            embedding: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Fetch a track by id.
    pub fn get_track(&self, id: i64) -> Result<Option<Track>> {
        let track = self
            .conn
            .query_row(
                &format!("SELECT {TRACK_COLUMNS} FROM tracks WHERE id = ?1"),
                [id],
                row_to_track,
            )
            .optional()?;
        Ok(track)
    }

    /// Fetch a track by its unique file path.
    pub fn get_track_by_path(&self, path: &Path) -> Result<Option<Track>> {
        let track = self
            .conn
            .query_row(
                &format!("SELECT {TRACK_COLUMNS} FROM tracks WHERE file_path = ?1"),
                [path.to_string_lossy().as_ref()],
                row_to_track,
            )
            .optional()?;
        Ok(track)
    }

    /// Fetch full track records for a set of ids.
    ///
    /// Returned in ascending-id order, which is NOT any caller's rank
    /// order; rank-sensitive callers re-sort explicitly.
    pub fn get_tracks_by_ids(&self, ids: &[i64]) -> Result<Vec<Track>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = repeat_vars(ids.len());
        let sql = format!(
            "SELECT {TRACK_COLUMNS} FROM tracks WHERE id IN ({placeholders}) ORDER BY id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let tracks = stmt
            .query_map(rusqlite::params_from_iter(ids), row_to_track)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tracks)
    }

    /// All catalog tracks in ascending-id order.
    pub fn list_tracks(&self) -> Result<Vec<Track>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {TRACK_COLUMNS} FROM tracks ORDER BY id"))?;
        let tracks = stmt
            .query_map([], row_to_track)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tracks)
    }

    /// Set the estimated tempo for a track.
    pub fn set_tempo(&self, id: i64, tempo_bpm: f64) -> Result<()> {
        self.update_track_field(id, "tempo_bpm", |conn, sql| {
            conn.execute(sql, rusqlite::params![tempo_bpm, Utc::now().to_rfc3339(), id])
        })
    }

    /// Cache the serialized audio embedding for a track.
    pub fn set_embedding(&self, id: i64, embedding: &[u8]) -> Result<()> {
        self.update_track_field(id, "embedding", |conn, sql| {
            conn.execute(sql, rusqlite::params![embedding, Utc::now().to_rfc3339(), id])
        })
    }

    /// Store fetched lyrics for a track.
    pub fn set_lyrics(&self, id: i64, lyrics: &str) -> Result<()> {
        self.update_track_field(id, "lyrics", |conn, sql| {
            conn.execute(sql, rusqlite::params![lyrics, Utc::now().to_rfc3339(), id])
        })
    }

    /// Store a lyric summary for a track.
    pub fn set_lyric_summary(&self, id: i64, summary: &str) -> Result<()> {
        self.update_track_field(id, "lyric_summary", |conn, sql| {
            conn.execute(sql, rusqlite::params![summary, Utc::now().to_rfc3339(), id])
        })
    }

    /// Store the musical key for a track.
    pub fn set_key_signature(&self, id: i64, key: &str) -> Result<()> {
        self.update_track_field(id, "key_signature", |conn, sql| {
            conn.execute(sql, rusqlite::params![key, Utc::now().to_rfc3339(), id])
        })
    }

    fn update_track_field<F>(&self, id: i64, column: &str, exec: F) -> Result<()>
    where
        F: FnOnce(&Connection, &str) -> rusqlite::Result<usize>,
    {
        let sql = format!("UPDATE tracks SET {column} = ?1, updated_at = ?2 WHERE id = ?3");
        let changed = exec(&self.conn, &sql)?;
        if changed == 0 {
            return Err(Error::NotFound {
                entity: "track",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// All tracks with a cached embedding, as `(id, blob)` pairs in
    /// ascending-id order.
    pub fn embedded_tracks(&self) -> Result<Vec<(i64, Vec<u8>)>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, embedding FROM tracks WHERE embedding IS NOT NULL ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Cached embeddings for a specific set of track ids, skipping
    /// tracks without one. Ascending-id order.
    pub fn embeddings_for(&self, ids: &[i64]) -> Result<Vec<(i64, Vec<u8>)>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = repeat_vars(ids.len());
        let sql = format!(
            "SELECT id, embedding FROM tracks
             WHERE id IN ({placeholders}) AND embedding IS NOT NULL
             ORDER BY id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(ids), |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Embedded tracks outside an exclusion set: the recommender's
    /// candidate pool, in ascending-id order.
    pub fn candidate_embeddings(&self, exclude: &HashSet<i64>) -> Result<Vec<(i64, Vec<u8>)>> {
        let all = self.embedded_tracks()?;
        Ok(all
            .into_iter()
            .filter(|(id, _)| !exclude.contains(id))
            .collect())
    }

    pub fn track_count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM tracks", [], |row| row.get(0))?)
    }

    pub fn embedded_track_count(&self) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM tracks WHERE embedding IS NOT NULL",
            [],
            |row| row.get(0),
        )?)
    }
}

// Listening events
impl CatalogDb {
    /// Append a listening event for a user and track.
    ///
    /// The event log is append-only; nothing here mutates or deletes
    /// existing rows.
    pub fn record_event(&self, user_id: i64, track_id: i64, kind: &EventKind) -> Result<ListeningEvent> {
        if self.get_track(track_id)?.is_none() {
            return Err(Error::NotFound {
                entity: "track",
                id: track_id.to_string(),
            });
        }

        let now = Utc::now();
        self.conn.execute(
            "INSERT INTO listening_events (user_id, track_id, kind, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![user_id, track_id, kind.as_str(), now.to_rfc3339()],
        )?;

        Ok(ListeningEvent {
            id: self.conn.last_insert_rowid(),
            user_id,
            track_id,
            kind: kind.clone(),
            created_at: now,
        })
    }

    /// Distinct track ids the user has fully played (the positive
    /// signal set), in ascending order.
    pub fn played_track_ids(&self, user_id: i64) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT track_id FROM listening_events
             WHERE user_id = ?1 AND kind = ?2
             ORDER BY track_id",
        )?;
        let ids = stmt
            .query_map(
                rusqlite::params![user_id, EventKind::PlayedFull.as_str()],
                |row| row.get(0),
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    /// Distinct track ids the user has any event for (the recommender's
    /// exclusion set), in ascending order.
    pub fn event_track_ids(&self, user_id: i64) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT track_id FROM listening_events
             WHERE user_id = ?1
             ORDER BY track_id",
        )?;
        let ids = stmt
            .query_map([user_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    pub fn event_count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM listening_events", [], |row| row.get(0))?)
    }
}

// Taste profiles
impl CatalogDb {
    /// Create or overwrite a user's taste profile.
    ///
    /// A single-statement conditional write: concurrent recomputations
    /// for the same user can never produce duplicate rows or interleave
    /// a partial overwrite.
    pub fn upsert_profile(&self, user_id: i64, vector: &[u8]) -> Result<()> {
        self.conn.execute(
            "INSERT INTO taste_profiles (user_id, vector, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                 vector = excluded.vector,
                 updated_at = excluded.updated_at",
            rusqlite::params![user_id, vector, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Fetch a user's taste profile, if one has been computed.
    pub fn get_profile(&self, user_id: i64) -> Result<Option<TasteProfile>> {
        let profile = self
            .conn
            .query_row(
                "SELECT user_id, vector, updated_at FROM taste_profiles WHERE user_id = ?1",
                [user_id],
                |row| {
                    Ok(TasteProfile {
                        user_id: row.get(0)?,
                        vector: row.get(1)?,
                        updated_at: parse_timestamp(2, &row.get::<_, String>(2)?)?,
                    })
                },
            )
            .optional()?;
        Ok(profile)
    }

    pub fn profile_count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM taste_profiles", [], |row| row.get(0))?)
    }
}

fn row_to_track(row: &rusqlite::Row) -> rusqlite::Result<Track> {
    let file_path: String = row.get(1)?;
    Ok(Track {
        id: row.get(0)?,
        file_path: PathBuf::from(file_path),
        title: row.get(2)?,
        artist: row.get(3)?,
        tempo_bpm: row.get(4)?,
        key_signature: row.get(5)?,
        lyrics: row.get(6)?,
        lyric_summary: row.get(7)?,
        embedding: row.get(8)?,
        created_at: parse_timestamp(9, &row.get::<_, String>(9)?)?,
        updated_at: parse_timestamp(10, &row.get::<_, String>(10)?)?,
    })
}

fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(Into::into)
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn repeat_vars(count: usize) -> String {
    let mut vars = "?,".repeat(count);
    vars.pop();
    vars
}
