use anyhow::Result;
use vehimatch_core::schema::Database;
use vehimatch_etl::Config;

#[allow(clippy::cast_precision_loss)]
pub fn list_runs(config: &Config, limit: usize) -> Result<()> {
    let db = Database::open(&config.database_path)?;
    let runs = db.list_evaluation_runs(limit)?;

    if runs.is_empty() {
        println!("No evaluation runs recorded");
        return Ok(());
    }

    println!(
        "{:<17} {:<14} {:>5} {:>8} {:>8} {:>9} {:>8} {:>8}",
        "STARTED", "BACKEND", "K", "QUERIES", "CORRECT", "PRECISION", "ERRORED", "SECONDS"
    );
    for run in runs {
        println!(
            "{:<17} {:<14} {:>5} {:>8} {:>8} {:>9.3} {:>8} {:>8.1}",
            run.started_at.format("%Y-%m-%d %H:%M"),
            run.backend,
            run.top_k,
            run.query_count,
            run.correct,
            run.precision,
            run.errored,
            run.duration().num_milliseconds() as f64 / 1000.0
        );
    }

    Ok(())
}
