//! CLI `enrol` command: recompute stored vectors for the whole catalog.

use anyhow::Result;

use hotel_search::config::ServiceConfig;
use hotel_search::server::open_catalog;

pub async fn enrol(config: &ServiceConfig) -> Result<()> {
    let catalog = open_catalog(config)?;
    let model = catalog.provider().model_name().to_string();

    let pb = super::spinner("embedding annotations")?;
    let result = catalog.enrol().await;
    pb.finish_and_clear();

    let modified = result?;
    println!("Enrolled {modified} hotel(s) with {model}.");
    Ok(())
}
