use anyhow::Result;

use hotel_search::config::ServiceConfig;
use hotel_search::ranking::CorpusSource;
use hotel_search::server::open_catalog;

/// Rank the catalog against a query and print the results.
pub async fn search(config: &ServiceConfig, query: &str, fresh: bool) -> Result<()> {
    let catalog = open_catalog(config)?;
    let source = if fresh {
        CorpusSource::Fresh
    } else {
        CorpusSource::Stored
    };

    let outcome = catalog.search(query, source).await?;

    if outcome.results.is_empty() {
        println!("No hotels in the catalog.");
        return Ok(());
    }

    println!(
        "Ranked {} hotel(s) in {:.3}s (embedding {:.3}s, similarity {:.3}s, sort {:.3}s)\n",
        outcome.results.len(),
        outcome.total.as_secs_f64(),
        outcome.timings.embedding.as_secs_f64(),
        outcome.timings.similarity.as_secs_f64(),
        outcome.timings.sort.as_secs_f64(),
    );
    if outcome.freshly_embedded > 0 && !fresh {
        println!(
            "  note: {} hotel(s) had no stored vectors; run `hotel-search enrol`\n",
            outcome.freshly_embedded
        );
    }

    for (i, result) in outcome.results.iter().enumerate() {
        println!(
            "  {}. hotel {} (max: {:.4}, mean: {:.4})",
            i + 1,
            result.hotel_id,
            result.max_similarity,
            result.mean_similarity,
        );
        for annotation in &result.annotations {
            let preview = if annotation.chars().count() > 100 {
                format!("{}...", annotation.chars().take(100).collect::<String>())
            } else {
                annotation.clone()
            };
            println!("       - {preview}");
        }
    }

    Ok(())
}
