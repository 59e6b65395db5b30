use anyhow::{Context, Result};
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use vehimatch_core::model::{EvaluationRun, RunId};
use vehimatch_core::schema::Database;
use vehimatch_etl::{Config, EvaluationSettings};
use vehimatch_eval::{EvalError, EvaluationReport, Evaluator, QueryStatus};
use vehimatch_search::{ElasticsearchBackend, SearchBackend};

pub async fn run_evaluate(
    config: &Config,
    settings: &EvaluationSettings,
    show_misses: bool,
) -> Result<()> {
    let db = Database::open(&config.database_path)?;
    let queries = db.list_noisy_queries(settings.limit)?;

    if queries.is_empty() {
        println!("No noisy variants stored");
        println!("Run 'vehimatch generate' first");
        return Err(EvalError::EmptyBatch.into());
    }

    let backend = ElasticsearchBackend::new(config.elasticsearch.clone())
        .context("Failed to create Elasticsearch client")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n  ⚠ Interrupted; finishing in-flight queries...");
            on_interrupt.cancel();
        }
    });

    let evaluator = Evaluator::new(settings.top_k)
        .with_concurrency(settings.concurrency)
        .with_timeout(settings.timeout())
        .with_cancellation(cancel);

    println!(
        "Evaluating {} queries against {} ({}/{})...",
        queries.len(),
        backend.name(),
        config.elasticsearch.url,
        config.elasticsearch.index
    );

    let started_at = Utc::now();
    let report = evaluator.evaluate(&queries, &backend).await?;
    let finished_at = Utc::now();

    let run = EvaluationRun {
        id: RunId::new(),
        backend: backend.name().to_string(),
        top_k: settings.top_k,
        query_count: report.metrics.query_count,
        correct: report.correct,
        errored: report.errored(),
        cancelled: report.cancelled,
        precision: report.metrics.precision,
        recall: report.metrics.recall,
        started_at,
        finished_at,
    };
    db.insert_evaluation_run(&run)?;

    print_report(&report, show_misses);
    println!("\n  Run id: {}", run.id);

    Ok(())
}

fn print_report(report: &EvaluationReport, show_misses: bool) {
    println!("\n📊 Evaluation Results\n");
    println!("  Queries:   {}", report.metrics.query_count);
    println!("  Correct:   {}", report.correct);
    println!("  Precision: {:.3}", report.metrics.precision);
    println!("  Recall:    {:.3}", report.metrics.recall);
    println!("  Mean distinct hits: {:.2}", report.mean_retrieved);

    if report.errored() > 0 {
        println!(
            "  Errored:   {} ({} timed out, {} failed)",
            report.errored(),
            report.timed_out,
            report.failed
        );
    }
    if report.cancelled > 0 {
        println!("  Cancelled: {} (not scored)", report.cancelled);
    }

    println!("\n  By noise type:");
    for (noise_type, metrics) in &report.by_noise_type {
        println!(
            "    {:<11} {:>6.3}  ({} queries)",
            noise_type.as_str(),
            metrics.precision,
            metrics.query_count
        );
    }

    if show_misses {
        println!("\n  Misses:");
        for outcome in report.outcomes.iter().filter(|o| !o.status.is_correct()) {
            let reason = match &outcome.status {
                QueryStatus::Missed => "missed".to_string(),
                QueryStatus::TimedOut => "timed out".to_string(),
                QueryStatus::Failed(e) => format!("failed: {e}"),
                QueryStatus::Correct => continue,
            };
            println!("    ✗ [{}] {:?} {}", outcome.noise_type, outcome.text, reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config(dir: &tempfile::TempDir) -> Config {
        Config {
            database_path: dir.path().join("vehicle.db"),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_no_stored_variants_fails_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = temp_config(&dir);

        let err = run_evaluate(&config, &EvaluationSettings::default(), false)
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<EvalError>(),
            Some(EvalError::EmptyBatch)
        ));
        let db = Database::open(&config.database_path).unwrap();
        assert!(db.list_evaluation_runs(10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_limit_fails_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = temp_config(&dir);
        let settings = EvaluationSettings {
            limit: 0,
            ..EvaluationSettings::default()
        };

        let err = run_evaluate(&config, &settings, false).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EvalError>(),
            Some(EvalError::EmptyBatch)
        ));
    }
}
