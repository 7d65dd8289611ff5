//! SQLite-backed vector similarity store.
//!
//! Keyed by the catalog track id rendered as a string. Consistency with
//! the catalog is cooperative, not transactional: "no entry for this
//! id" is a legitimate, checkable state meaning "not yet processed",
//! and every writer is idempotent on that check.
//!
//! Nearest-neighbor search is a deterministic brute-force scan in
//! cosine-distance order. A single-process catalog does not need an
//! approximate index; determinism matters more here.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use std::cmp::Ordering;
use std::path::Path;

use resona_core::{embedding, Error, Result};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS vectors (
    id TEXT PRIMARY KEY,
    embedding BLOB NOT NULL,
    dim INTEGER NOT NULL,
    metadata TEXT,
    updated_at TEXT NOT NULL
);
";

/// A stored vector record.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub embedding: Vec<f32>,
    pub metadata: Option<serde_json::Value>,
}

/// A nearest-neighbor hit, nearest first when returned from
/// [`VectorStore::query`].
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub id: String,
    /// Cosine distance: `1 - cosine_similarity`, so smaller is nearer.
    pub distance: f64,
}

/// The vector similarity store.
#[derive(Debug)]
pub struct VectorStore {
    conn: Connection,
}

impl VectorStore {
    /// Open (or create) a vector store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Open an in-memory vector store (for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Insert or overwrite the vector for an id.
    pub fn upsert(
        &self,
        id: &str,
        vector: &[f32],
        metadata: Option<&serde_json::Value>,
    ) -> Result<()> {
        if vector.is_empty() {
            return Err(Error::Embedding("refusing to store an empty vector".to_string()));
        }

        let metadata_json = metadata.map(serde_json::Value::to_string);
        self.conn.execute(
            "INSERT INTO vectors (id, embedding, dim, metadata, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                 embedding = excluded.embedding,
                 dim = excluded.dim,
                 metadata = excluded.metadata,
                 updated_at = excluded.updated_at",
            rusqlite::params![
                id,
                embedding::to_bytes(vector),
                vector.len() as i64,
                metadata_json,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Whether an id has been processed into the store.
    pub fn contains(&self, id: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM vectors WHERE id = ?1", [id], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    /// Fetch a single record by id.
    pub fn get(&self, id: &str) -> Result<Option<VectorRecord>> {
        let row: Option<(Vec<u8>, Option<String>)> = self
            .conn
            .query_row(
                "SELECT embedding, metadata FROM vectors WHERE id = ?1",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((blob, metadata_json)) = row else {
            return Ok(None);
        };

        let metadata = match metadata_json {
            Some(json) => Some(serde_json::from_str(&json)?),
            None => None,
        };

        Ok(Some(VectorRecord {
            id: id.to_string(),
            embedding: embedding::from_bytes(&blob)?,
            metadata,
        }))
    }

    /// Return the `k` nearest neighbors to a query vector, nearest
    /// first.
    ///
    /// Ties in distance break on ascending numeric id so repeated
    /// queries are stable. Malformed rows are skipped with a warning,
    /// never fatal. An empty store yields an empty list.
    pub fn query(&self, query_vector: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut stmt = self
            .conn
            .prepare("SELECT id, embedding FROM vectors ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut neighbors = Vec::with_capacity(rows.len());
        for (id, blob) in rows {
            let vector = match embedding::from_bytes(&blob) {
                Ok(vector) => vector,
                Err(e) => {
                    log::warn!("Skipping malformed vector row {id}: {e}");
                    continue;
                }
            };
            let similarity = embedding::cosine_similarity(query_vector, &vector);
            neighbors.push(Neighbor {
                id,
                distance: 1.0 - f64::from(similarity),
            });
        }

        neighbors.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(Ordering::Equal)
                .then_with(|| compare_ids(&a.id, &b.id))
        });
        neighbors.truncate(k);
        Ok(neighbors)
    }

    /// Number of stored vectors.
    pub fn len(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM vectors", [], |row| row.get(0))?)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Compare ids numerically when both parse as integers (they are track
/// ids in practice), falling back to lexical order otherwise.
fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(left), Ok(right)) => left.cmp(&right),
        _ => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_store_query_is_empty() {
        let store = VectorStore::open_in_memory().unwrap();
        assert!(store.is_empty().unwrap());
        assert!(store.query(&[1.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_upsert_overwrites_existing_id() {
        let store = VectorStore::open_in_memory().unwrap();
        store.upsert("1", &[1.0, 0.0], None).unwrap();
        store.upsert("1", &[0.0, 1.0], None).unwrap();

        assert_eq!(store.len().unwrap(), 1);
        let record = store.get("1").unwrap().unwrap();
        assert_eq!(record.embedding, vec![0.0, 1.0]);
    }

    #[test]
    fn test_contains_means_processed() {
        let store = VectorStore::open_in_memory().unwrap();
        assert!(!store.contains("1").unwrap());
        store.upsert("1", &[1.0, 0.0], None).unwrap();
        assert!(store.contains("1").unwrap());
    }

    #[test]
    fn test_metadata_round_trip() {
        let store = VectorStore::open_in_memory().unwrap();
        let metadata = serde_json::json!({"title": "Alpha", "artist": "Artist"});
        store.upsert("1", &[1.0, 0.0], Some(&metadata)).unwrap();

        let record = store.get("1").unwrap().unwrap();
        assert_eq!(record.metadata, Some(metadata));
    }

    #[test]
    fn test_query_orders_nearest_first() {
        let store = VectorStore::open_in_memory().unwrap();
        store.upsert("1", &[1.0, 0.0], None).unwrap();
        store.upsert("2", &[0.0, 1.0], None).unwrap();
        store.upsert("3", &[0.7, 0.7], None).unwrap();

        let neighbors = store.query(&[1.0, 0.0], 2).unwrap();
        assert_eq!(neighbors.len(), 2);
        assert_eq!(neighbors[0].id, "1");
        assert_eq!(neighbors[1].id, "3");
        assert!(neighbors[0].distance < neighbors[1].distance);
    }

    #[test]
    fn test_query_ties_break_on_numeric_id() {
        let store = VectorStore::open_in_memory().unwrap();
        // Same direction, same distance; ids chosen so lexical order
        // would differ from numeric order.
        store.upsert("10", &[1.0, 0.0], None).unwrap();
        store.upsert("2", &[2.0, 0.0], None).unwrap();

        let neighbors = store.query(&[1.0, 0.0], 2).unwrap();
        assert_eq!(neighbors[0].id, "2");
        assert_eq!(neighbors[1].id, "10");
    }

    #[test]
    fn test_query_skips_malformed_rows() {
        let store = VectorStore::open_in_memory().unwrap();
        store.upsert("1", &[1.0, 0.0], None).unwrap();
        // Corrupt a row behind the codec's back.
        store
            .conn
            .execute(
                "INSERT INTO vectors (id, embedding, dim, updated_at)
                 VALUES ('2', X'0102', 1, '2026-01-01T00:00:00Z')",
                [],
            )
            .unwrap();

        let neighbors = store.query(&[1.0, 0.0], 10).unwrap();
        assert_eq!(neighbors.len(), 1);
        assert_eq!(neighbors[0].id, "1");
    }

    #[test]
    fn test_rejects_empty_vector() {
        let store = VectorStore::open_in_memory().unwrap();
        assert!(store.upsert("1", &[], None).is_err());
    }
}
