use anyhow::{Context, Result};
use vehimatch_etl::Config;
use vehimatch_search::{extract_year_filter, ElasticsearchBackend, SearchBackend};

pub async fn run_search(config: &Config, query: &str, top_k: usize) -> Result<()> {
    let backend = ElasticsearchBackend::new(config.elasticsearch.clone())
        .context("Failed to create Elasticsearch client")?;

    let year_filter = extract_year_filter(query);
    println!("🔍 {:?}", query);
    if let Some(year) = year_filter {
        println!("   year filter: {}", year);
    }

    let hits = backend.search(query, top_k, year_filter).await?;

    if hits.is_empty() {
        println!("\n  No results");
        return Ok(());
    }

    println!();
    for (rank, hit) in hits.iter().enumerate() {
        println!(
            "  {:>2}. {} {} {}  (score {:.3})",
            rank + 1,
            hit.year,
            hit.make,
            hit.model,
            hit.score
        );
    }

    Ok(())
}
