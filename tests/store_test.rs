mod helpers;

use std::collections::BTreeSet;
use std::sync::Arc;

use hotel_search::catalog::ids::IdAllocator;
use hotel_search::catalog::store::{AnnotationStore, SqliteStore};
use hotel_search::catalog::types::Hotel;
use hotel_search::db;
use tempfile::TempDir;

#[test]
fn open_creates_new_db_at_nonexistent_path() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("subdir").join("catalog.db");
    assert!(!db_path.exists());

    let store = SqliteStore::open(&db_path).unwrap();
    assert!(db_path.exists());
    assert_eq!(store.count().unwrap(), 0);
}

#[test]
fn busy_timeout_and_schema_version_are_set() {
    let tmp = TempDir::new().unwrap();
    let conn = db::open_database(tmp.path().join("catalog.db")).unwrap();

    let timeout: i64 = conn
        .pragma_query_value(None, "busy_timeout", |row| row.get(0))
        .unwrap();
    assert_eq!(timeout, 5000);

    let report = db::check_database_health(&conn).unwrap();
    assert!(report.integrity_ok);
    assert_eq!(report.schema_version, db::migrations::CURRENT_SCHEMA_VERSION);
    assert_eq!(report.hotel_count, 0);
}

#[test]
fn hotels_and_vectors_survive_reopen() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("catalog.db");

    {
        let store = SqliteStore::open(&db_path).unwrap();
        store
            .insert(
                &Hotel::new(1, vec![helpers::BEACHFRONT.into()])
                    .with_embeddings(vec![vec![0.25, -0.5, 1.0]]),
            )
            .unwrap();
        store.insert(&Hotel::new(2, vec![helpers::MOUNTAIN.into()])).unwrap();
        store.set_embedding_model("hashed").unwrap();
    }

    let store = SqliteStore::open(&db_path).unwrap();
    let hotels = store.find_all().unwrap();
    assert_eq!(hotels.len(), 2);
    assert_eq!(hotels[0].embeddings, Some(vec![vec![0.25, -0.5, 1.0]]));
    assert!(!hotels[1].is_enrolled());
    assert_eq!(store.embedding_model().unwrap().as_deref(), Some("hashed"));

    let conn = db::open_database(&db_path).unwrap();
    let report = db::check_database_health(&conn).unwrap();
    assert_eq!(report.hotel_count, 2);
    assert_eq!(report.annotation_count, 2);
    assert_eq!(report.unenrolled_hotels, 1);
}

#[test]
fn concurrent_allocators_on_separate_connections_never_collide() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("catalog.db");
    // Create schema once before the writers race.
    drop(SqliteStore::open(&db_path).unwrap());

    const THREADS: usize = 4;
    const PER_THREAD: usize = 25;

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let path = db_path.clone();
            std::thread::spawn(move || {
                let store: Arc<dyn AnnotationStore> = Arc::new(SqliteStore::open(&path).unwrap());
                let ids = IdAllocator::new(store, "hotelId");
                (0..PER_THREAD)
                    .map(|_| ids.next_id().unwrap())
                    .collect::<Vec<i64>>()
            })
        })
        .collect();

    let mut all = Vec::new();
    for handle in handles {
        let ids = handle.join().unwrap();
        // each caller sees its own ids strictly increasing
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        all.extend(ids);
    }

    let total = (THREADS * PER_THREAD) as i64;
    let unique: BTreeSet<i64> = all.iter().copied().collect();
    assert_eq!(all.len() as i64, total);
    assert_eq!(unique, (1..=total).collect::<BTreeSet<i64>>());
}

#[test]
fn reset_restarts_ids_at_one_across_connections() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("catalog.db");

    let first: Arc<dyn AnnotationStore> = Arc::new(SqliteStore::open(&db_path).unwrap());
    let second: Arc<dyn AnnotationStore> = Arc::new(SqliteStore::open(&db_path).unwrap());
    let a = IdAllocator::new(first, "hotelId");
    let b = IdAllocator::new(second, "hotelId");

    assert_eq!(a.next_id().unwrap(), 1);
    assert_eq!(b.next_id().unwrap(), 2);
    a.reset().unwrap();
    assert_eq!(b.next_id().unwrap(), 1);
}
