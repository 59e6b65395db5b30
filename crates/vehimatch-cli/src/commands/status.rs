use anyhow::Result;
use vehimatch_core::schema::Database;
use vehimatch_etl::Config;

pub fn show_status(config: &Config) -> Result<()> {
    let db = Database::open(&config.database_path)?;

    let records = db.count_models()?;
    let variants = db.count_noisy_variants()?;

    println!("\n📊 Vehimatch Status\n");
    println!("  Database: {}", config.database_path.display());
    println!("  Canonical records: {}", records);
    println!("  Noisy variants: {}", variants);

    for (noise_type, count) in db.count_noisy_by_type()? {
        println!("    {:<11} {}", noise_type.as_str(), count);
    }

    if let Some(run) = db.list_evaluation_runs(1)?.into_iter().next() {
        println!(
            "\n  Last evaluation: {} on {}, precision {:.3} over {} queries",
            run.started_at.format("%Y-%m-%d %H:%M"),
            run.backend,
            run.precision,
            run.query_count
        );
    }

    if records > 0 && variants == 0 {
        println!("\n  Run `vehimatch generate` to create noisy variants");
    }

    Ok(())
}
