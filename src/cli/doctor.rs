//! CLI `doctor` command: run database diagnostics and print a health report.

use anyhow::{Context, Result};

use hotel_search::config::ServiceConfig;
use hotel_search::db;
use hotel_search::embedding;

/// Run database diagnostics and print a health report.
pub fn doctor(config: &ServiceConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `hotel-search serve` or `hotel-search populate` to initialize.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let conn = db::open_database(&db_path).context("failed to open database (may be corrupt)")?;

    let report = db::check_database_health(&conn).context("failed to run health check")?;

    let configured_model = embedding::configured_model_id(&config.embedding);

    println!("Hotel Search Health Report");
    println!("==========================");
    println!();
    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    println!();
    println!("Embedding model:");
    println!(
        "  Stored:          {}",
        report.embedding_model.as_deref().unwrap_or("(not set)")
    );
    println!("  Configured:      {configured_model} ({})", config.embedding.provider);
    if let Some(ref stored) = report.embedding_model {
        if *stored != configured_model {
            println!("  WARNING: model mismatch! Run `hotel-search enrol` to recompute vectors.");
        } else {
            println!("  Status:          OK (match)");
        }
    }
    println!();
    println!("Row counts:");
    println!("  Hotels:          {}", report.hotel_count);
    println!("  Annotations:     {}", report.annotation_count);
    println!("  Not enrolled:    {}", report.unenrolled_hotels);
    println!();
    println!("Counters:");
    if report.counters.is_empty() {
        println!("  (none)");
    }
    for (name, value) in &report.counters {
        println!("  {name:<17}{value}");
    }
    println!();
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
        println!();
        println!("Recovery steps:");
        println!("  1. Restore from a backup of {}", db_path.display());
        println!("  2. Or run `hotel-search reset` and `hotel-search populate` to rebuild");
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
