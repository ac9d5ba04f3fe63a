//! Annotation storage.
//!
//! [`AnnotationStore`] is the capability contract the engine and write paths
//! depend on. Any backend must implement [`AnnotationStore::atomic_increment_counter`]
//! as one indivisible create-if-absent-and-increment operation.
//! [`SqliteStore`] is the bundled implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension, Transaction};

use crate::catalog::types::Hotel;
use crate::db;
use crate::error::{Result, SearchError};

pub trait AnnotationStore: Send + Sync {
    /// Every hotel, ordered by id, read as one consistent snapshot.
    fn find_all(&self) -> Result<Vec<Hotel>>;

    fn find_by_id(&self, hotel_id: i64) -> Result<Option<Hotel>>;

    /// Insert a new hotel. Fails if the id is taken.
    fn insert(&self, hotel: &Hotel) -> Result<i64>;

    /// Insert several hotels in one transaction. Returns the number inserted.
    fn insert_many(&self, hotels: &[Hotel]) -> Result<usize>;

    /// Replace a hotel's annotations and vectors. Returns `false` if the hotel does not exist.
    fn update_annotations(
        &self,
        hotel_id: i64,
        annotations: &[String],
        embeddings: &[Vec<f32>],
    ) -> Result<bool>;

    /// Append annotations and vectors after the existing ones. Returns `false` if the hotel
    /// does not exist.
    fn append_annotations(
        &self,
        hotel_id: i64,
        annotations: &[String],
        embeddings: &[Vec<f32>],
    ) -> Result<bool>;

    /// Overwrite the vectors of several hotels. Returns the number of hotels modified.
    fn bulk_update_embeddings(&self, updates: &[(i64, Vec<Vec<f32>>)]) -> Result<usize>;

    fn delete_by_id(&self, hotel_id: i64) -> Result<usize>;

    fn delete_all(&self) -> Result<usize>;

    /// Number of hotels in the catalog.
    fn count(&self) -> Result<usize>;

    /// Increment the named counter and return the new value, creating it at 0 first if absent.
    fn atomic_increment_counter(&self, name: &str) -> Result<i64>;

    /// Set the named counter back to 0.
    fn reset_counter(&self, name: &str) -> Result<()>;

    /// Model identifier recorded with the most recent vector write.
    fn embedding_model(&self) -> Result<Option<String>>;

    fn set_embedding_model(&self, model: &str) -> Result<()>;
}

/// SQLite-backed store. One connection, serialised behind a mutex; other
/// processes may open their own connections to the same file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Ok(Self::new(db::open_database(path)?))
    }

    pub fn in_memory() -> anyhow::Result<Self> {
        Ok(Self::new(db::open_memory_database()?))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| SearchError::Storage(format!("db lock poisoned: {e}")))
    }
}

impl AnnotationStore for SqliteStore {
    fn find_all(&self) -> Result<Vec<Hotel>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT h.id, a.content, a.embedding FROM hotels h \
             LEFT JOIN annotations a ON a.hotel_id = h.id \
             ORDER BY h.id, a.position",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<rusqlite::Result<Vec<AnnotationRow>>>()?;
        collect_hotels(rows)
    }

    fn find_by_id(&self, hotel_id: i64) -> Result<Option<Hotel>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT h.id, a.content, a.embedding FROM hotels h \
             LEFT JOIN annotations a ON a.hotel_id = h.id \
             WHERE h.id = ?1 ORDER BY a.position",
        )?;
        let rows = stmt
            .query_map(params![hotel_id], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?
            .collect::<rusqlite::Result<Vec<AnnotationRow>>>()?;
        Ok(collect_hotels(rows)?.into_iter().next())
    }

    fn insert(&self, hotel: &Hotel) -> Result<i64> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        insert_hotel(&tx, hotel)?;
        tx.commit()?;
        tracing::debug!(
            hotel_id = hotel.hotel_id,
            annotations = hotel.annotations.len(),
            "hotel inserted"
        );
        Ok(hotel.hotel_id)
    }

    fn insert_many(&self, hotels: &[Hotel]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for hotel in hotels {
            insert_hotel(&tx, hotel)?;
        }
        tx.commit()?;
        Ok(hotels.len())
    }

    fn update_annotations(
        &self,
        hotel_id: i64,
        annotations: &[String],
        embeddings: &[Vec<f32>],
    ) -> Result<bool> {
        check_aligned(annotations, embeddings)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        if !hotel_exists(&tx, hotel_id)? {
            return Ok(false);
        }
        tx.execute("DELETE FROM annotations WHERE hotel_id = ?1", params![hotel_id])?;
        insert_annotation_rows(&tx, hotel_id, 0, annotations, Some(embeddings))?;
        touch(&tx, hotel_id)?;
        tx.commit()?;
        Ok(true)
    }

    fn append_annotations(
        &self,
        hotel_id: i64,
        annotations: &[String],
        embeddings: &[Vec<f32>],
    ) -> Result<bool> {
        check_aligned(annotations, embeddings)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        if !hotel_exists(&tx, hotel_id)? {
            return Ok(false);
        }
        let next_position: i64 = tx.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM annotations WHERE hotel_id = ?1",
            params![hotel_id],
            |row| row.get(0),
        )?;
        insert_annotation_rows(&tx, hotel_id, next_position, annotations, Some(embeddings))?;
        touch(&tx, hotel_id)?;
        tx.commit()?;
        Ok(true)
    }

    fn bulk_update_embeddings(&self, updates: &[(i64, Vec<Vec<f32>>)]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut modified = 0;
        for (hotel_id, vectors) in updates {
            let positions: Vec<i64> = tx
                .prepare("SELECT position FROM annotations WHERE hotel_id = ?1 ORDER BY position")?
                .query_map(params![hotel_id], |row| row.get(0))?
                .collect::<rusqlite::Result<_>>()?;
            if positions.is_empty() {
                continue;
            }
            if positions.len() != vectors.len() {
                return Err(SearchError::Storage(format!(
                    "hotel {hotel_id} has {} annotations but {} embeddings were supplied",
                    positions.len(),
                    vectors.len()
                )));
            }
            for (position, vector) in positions.iter().zip(vectors) {
                tx.execute(
                    "UPDATE annotations SET embedding = ?1 WHERE hotel_id = ?2 AND position = ?3",
                    params![embedding_to_bytes(vector), hotel_id, position],
                )?;
            }
            touch(&tx, *hotel_id)?;
            modified += 1;
        }
        tx.commit()?;
        Ok(modified)
    }

    fn delete_by_id(&self, hotel_id: i64) -> Result<usize> {
        let conn = self.lock()?;
        Ok(conn.execute("DELETE FROM hotels WHERE id = ?1", params![hotel_id])?)
    }

    fn delete_all(&self) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM annotations", [])?;
        let deleted = tx.execute("DELETE FROM hotels", [])?;
        tx.commit()?;
        Ok(deleted)
    }

    fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM hotels", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    fn atomic_increment_counter(&self, name: &str) -> Result<i64> {
        let conn = self.lock()?;
        // Single statement: upsert and read back happen under one write lock
        let value = conn.query_row(
            "INSERT INTO counters (name, sequence_value) VALUES (?1, 1) \
             ON CONFLICT(name) DO UPDATE SET sequence_value = sequence_value + 1 \
             RETURNING sequence_value",
            params![name],
            |row| row.get(0),
        )?;
        Ok(value)
    }

    fn reset_counter(&self, name: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO counters (name, sequence_value) VALUES (?1, 0) \
             ON CONFLICT(name) DO UPDATE SET sequence_value = 0",
            params![name],
        )?;
        Ok(())
    }

    fn embedding_model(&self) -> Result<Option<String>> {
        let conn = self.lock()?;
        Ok(db::migrations::get_embedding_model(&conn)?)
    }

    fn set_embedding_model(&self, model: &str) -> Result<()> {
        let conn = self.lock()?;
        Ok(db::migrations::set_embedding_model(&conn, model)?)
    }
}

/// `(hotel id, annotation content, embedding bytes)`; content is `None` for a hotel
/// with no annotation rows.
type AnnotationRow = (i64, Option<String>, Option<Vec<u8>>);

/// Fold id-ordered join rows into hotels. A hotel counts as enrolled only when
/// every one of its rows carries a vector.
fn collect_hotels(rows: Vec<AnnotationRow>) -> Result<Vec<Hotel>> {
    let mut hotels: Vec<(Hotel, Vec<Option<Vec<f32>>>)> = Vec::new();
    for (hotel_id, content, embedding) in rows {
        if hotels.last().map(|(h, _)| h.hotel_id) != Some(hotel_id) {
            hotels.push((Hotel::new(hotel_id, vec![]), vec![]));
        }
        let Some((hotel, vectors)) = hotels.last_mut() else {
            continue;
        };
        if let Some(content) = content {
            hotel.annotations.push(content);
            vectors.push(embedding.as_deref().map(bytes_to_embedding).transpose()?);
        }
    }

    Ok(hotels
        .into_iter()
        .map(|(mut hotel, vectors)| {
            if !vectors.is_empty() {
                hotel.embeddings = vectors.into_iter().collect();
            }
            hotel
        })
        .collect())
}

fn insert_hotel(tx: &Transaction, hotel: &Hotel) -> Result<()> {
    if let Some(embeddings) = &hotel.embeddings {
        check_aligned(&hotel.annotations, embeddings)?;
    }
    let now = chrono::Utc::now().to_rfc3339();
    tx.execute(
        "INSERT INTO hotels (id, created_at, updated_at) VALUES (?1, ?2, ?2)",
        params![hotel.hotel_id, now],
    )?;
    insert_annotation_rows(
        tx,
        hotel.hotel_id,
        0,
        &hotel.annotations,
        hotel.embeddings.as_deref(),
    )
}

fn insert_annotation_rows(
    tx: &Transaction,
    hotel_id: i64,
    first_position: i64,
    annotations: &[String],
    embeddings: Option<&[Vec<f32>]>,
) -> Result<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO annotations (hotel_id, position, content, embedding) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (i, content) in annotations.iter().enumerate() {
        let bytes = embeddings.map(|e| embedding_to_bytes(&e[i]));
        stmt.execute(params![hotel_id, first_position + i as i64, content, bytes])?;
    }
    Ok(())
}

fn hotel_exists(tx: &Transaction, hotel_id: i64) -> Result<bool> {
    Ok(tx
        .query_row("SELECT 1 FROM hotels WHERE id = ?1", params![hotel_id], |_| Ok(()))
        .optional()?
        .is_some())
}

fn touch(tx: &Transaction, hotel_id: i64) -> Result<()> {
    tx.execute(
        "UPDATE hotels SET updated_at = ?1 WHERE id = ?2",
        params![chrono::Utc::now().to_rfc3339(), hotel_id],
    )?;
    Ok(())
}

fn check_aligned(annotations: &[String], embeddings: &[Vec<f32>]) -> Result<()> {
    if annotations.len() != embeddings.len() {
        return Err(SearchError::Storage(format!(
            "{} annotations but {} embeddings",
            annotations.len(),
            embeddings.len()
        )));
    }
    Ok(())
}

/// Encode a vector as little-endian `f32` bytes.
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|x| x.to_le_bytes()).collect()
}

pub fn bytes_to_embedding(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(SearchError::Storage(format!(
            "corrupt embedding blob of {} bytes",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteStore {
        SqliteStore::in_memory().unwrap()
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn embedding_bytes_are_little_endian_f32() {
        let v = vec![1.0f32, -0.5, 0.25];
        let bytes = embedding_to_bytes(&v);
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[0..4], &1.0f32.to_le_bytes());
        assert_eq!(bytes_to_embedding(&bytes).unwrap(), v);
        assert!(bytes_to_embedding(&bytes[..5]).is_err());
    }

    #[test]
    fn find_all_is_ordered_and_aligned() {
        let store = store();
        store
            .insert(&Hotel::new(2, texts(&["Cozy hotel", "Free parking"])))
            .unwrap();
        store
            .insert(
                &Hotel::new(1, texts(&["Spa hotel"])).with_embeddings(vec![vec![0.1, 0.2]]),
            )
            .unwrap();

        let hotels = store.find_all().unwrap();
        assert_eq!(hotels.len(), 2);
        assert_eq!(hotels[0].hotel_id, 1);
        assert_eq!(hotels[0].embeddings, Some(vec![vec![0.1, 0.2]]));
        assert_eq!(hotels[1].hotel_id, 2);
        assert_eq!(hotels[1].annotations, texts(&["Cozy hotel", "Free parking"]));
        assert!(hotels[1].embeddings.is_none());
    }

    #[test]
    fn partially_embedded_hotel_is_not_enrolled() {
        let store = store();
        store.insert(&Hotel::new(1, texts(&["a", "b"]))).unwrap();
        let conn = store.lock().unwrap();
        conn.execute(
            "UPDATE annotations SET embedding = ?1 WHERE hotel_id = 1 AND position = 0",
            params![embedding_to_bytes(&[1.0])],
        )
        .unwrap();
        drop(conn);

        let hotel = store.find_by_id(1).unwrap().unwrap();
        assert!(hotel.embeddings.is_none());
        assert!(!hotel.is_enrolled());
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let store = store();
        store.insert(&Hotel::new(1, texts(&["a"]))).unwrap();
        let err = store.insert(&Hotel::new(1, texts(&["b"]))).unwrap_err();
        assert!(matches!(err, SearchError::Storage(_)));
        assert_eq!(store.find_by_id(1).unwrap().unwrap().annotations, texts(&["a"]));
    }

    #[test]
    fn update_replaces_and_reports_missing() {
        let store = store();
        store
            .insert(&Hotel::new(1, texts(&["old one", "old two"])))
            .unwrap();

        let updated = store
            .update_annotations(1, &texts(&["new"]), &[vec![0.5, 0.5]])
            .unwrap();
        assert!(updated);
        let hotel = store.find_by_id(1).unwrap().unwrap();
        assert_eq!(hotel.annotations, texts(&["new"]));
        assert_eq!(hotel.embeddings, Some(vec![vec![0.5, 0.5]]));

        assert!(!store.update_annotations(99, &texts(&["x"]), &[vec![1.0]]).unwrap());
    }

    #[test]
    fn append_keeps_existing_annotations_first() {
        let store = store();
        store
            .insert(&Hotel::new(4, texts(&["first"])).with_embeddings(vec![vec![1.0]]))
            .unwrap();
        assert!(store
            .append_annotations(4, &texts(&["second", "third"]), &[vec![2.0], vec![3.0]])
            .unwrap());

        let hotel = store.find_by_id(4).unwrap().unwrap();
        assert_eq!(hotel.annotations, texts(&["first", "second", "third"]));
        assert_eq!(hotel.embeddings, Some(vec![vec![1.0], vec![2.0], vec![3.0]]));
        assert!(!store.append_annotations(5, &texts(&["x"]), &[vec![1.0]]).unwrap());
    }

    #[test]
    fn misaligned_writes_are_rejected() {
        let store = store();
        store.insert(&Hotel::new(1, texts(&["a"]))).unwrap();
        assert!(store.update_annotations(1, &texts(&["a", "b"]), &[vec![1.0]]).is_err());
        assert!(store
            .insert(&Hotel::new(2, texts(&["a"])).with_embeddings(vec![]))
            .is_err());
    }

    #[test]
    fn bulk_update_counts_modified_hotels() {
        let store = store();
        store.insert(&Hotel::new(1, texts(&["a", "b"]))).unwrap();
        store.insert(&Hotel::new(2, texts(&["c"]))).unwrap();

        let modified = store
            .bulk_update_embeddings(&[
                (1, vec![vec![1.0, 0.0], vec![0.0, 1.0]]),
                (2, vec![vec![0.5, 0.5]]),
                (3, vec![vec![0.0, 0.0]]),
            ])
            .unwrap();
        assert_eq!(modified, 2);
        assert!(store.find_all().unwrap().iter().all(Hotel::is_enrolled));
    }

    #[test]
    fn bulk_update_with_wrong_count_changes_nothing() {
        let store = store();
        store.insert(&Hotel::new(1, texts(&["a"]))).unwrap();
        store.insert(&Hotel::new(2, texts(&["b", "c"]))).unwrap();
        let err = store
            .bulk_update_embeddings(&[(1, vec![vec![1.0]]), (2, vec![vec![1.0]])])
            .unwrap_err();
        assert!(matches!(err, SearchError::Storage(_)));
        assert!(store.find_by_id(1).unwrap().unwrap().embeddings.is_none());
    }

    #[test]
    fn delete_by_id_and_all() {
        let store = store();
        for id in 1..=3 {
            store.insert(&Hotel::new(id, texts(&["x"]))).unwrap();
        }
        assert_eq!(store.count().unwrap(), 3);
        assert_eq!(store.delete_by_id(2).unwrap(), 1);
        assert_eq!(store.delete_by_id(2).unwrap(), 0);
        assert_eq!(store.delete_all().unwrap(), 2);
        assert!(store.find_all().unwrap().is_empty());
    }

    #[test]
    fn counter_creates_increments_and_resets() {
        let store = store();
        assert_eq!(store.atomic_increment_counter("hotelId").unwrap(), 1);
        assert_eq!(store.atomic_increment_counter("hotelId").unwrap(), 2);
        assert_eq!(store.atomic_increment_counter("other").unwrap(), 1);
        store.reset_counter("hotelId").unwrap();
        assert_eq!(store.atomic_increment_counter("hotelId").unwrap(), 1);
        assert_eq!(store.atomic_increment_counter("other").unwrap(), 2);
    }

    #[test]
    fn reset_of_missing_counter_starts_at_one() {
        let store = store();
        store.reset_counter("fresh").unwrap();
        assert_eq!(store.atomic_increment_counter("fresh").unwrap(), 1);
    }
}
