use anyhow::Result;

use hotel_search::config::ServiceConfig;
use hotel_search::server::open_catalog;

/// Fill the catalog with synthetic hotels.
pub async fn populate(
    config: &ServiceConfig,
    count: Option<usize>,
    seed: Option<u64>,
) -> Result<()> {
    let catalog = open_catalog(config)?;

    let pb = super::spinner("generating hotels")?;
    let result = catalog.populate(count, seed).await;
    pb.finish_and_clear();

    let outcome = result?;
    println!(
        "Inserted {} hotel(s) in {:.2}s. Catalog now holds {}.",
        outcome.inserted,
        outcome.elapsed.as_secs_f64(),
        catalog.count().await?
    );
    Ok(())
}
