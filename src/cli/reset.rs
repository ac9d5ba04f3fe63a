//! CLI `reset` command: delete every hotel and restart id allocation at 1.

use anyhow::{bail, Result};
use std::io::Write;
use std::sync::Arc;

use hotel_search::catalog::store::{AnnotationStore, SqliteStore};
use hotel_search::catalog::ids::IdAllocator;
use hotel_search::config::ServiceConfig;

/// Delete all hotels after user confirmation (skipped with `--yes`).
pub fn reset(config: &ServiceConfig, yes: bool) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !yes {
        println!("WARNING: This will permanently delete ALL hotels and annotations.");
        println!("Database: {}", db_path.display());
        print!("\nType YES to confirm: ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if input.trim() != "YES" {
            bail!("reset cancelled");
        }
    }

    let store = Arc::new(SqliteStore::open(&db_path)?);
    let deleted = store.delete_all()?;
    IdAllocator::new(store, config.storage.counter_name.clone()).reset()?;

    println!("Deleted {deleted} hotel(s). Next hotel id is 1.");
    Ok(())
}
