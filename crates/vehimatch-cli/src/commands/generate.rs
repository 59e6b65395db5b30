use anyhow::Result;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use vehimatch_core::schema::Database;
use vehimatch_core::{AliasTable, NoiseGenerator};
use vehimatch_etl::{build_pipeline, Config, CorpusJob, GenerationSettings, NoiseGenerationStage};

pub async fn run_generate(
    config: &Config,
    aliases: Arc<AliasTable>,
    settings: GenerationSettings,
    replace: bool,
) -> Result<()> {
    let db_path = &config.database_path;
    log::info!("Starting noise generation for {}", db_path.display());

    {
        let db = Database::open(db_path)?;
        let records = db.count_models()?;
        println!("Found {} canonical records in database", records);
        if records == 0 {
            println!("Nothing to generate; load makes and models first");
            return Ok(());
        }
        if replace {
            let removed = db.clear_noisy_variants()?;
            println!("Removed {} previously generated variants", removed);
        }
    }

    let stage = NoiseGenerationStage::new(
        db_path.clone(),
        NoiseGenerator::new(aliases),
        settings,
    );
    let summary = stage.summary_handle();
    let workflow = build_pipeline(stage)?;

    let state_path = db_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("pipeline.db");
    let mut store = treadle::SqliteStateStore::open(&state_path).await?;

    let job_id = format!("generate-{}", Utc::now().format("%Y%m%dT%H%M%S%.3f"));
    let job = CorpusJob::new(job_id, db_path.display().to_string());

    let mut events = workflow.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                treadle::WorkflowEvent::StageStarted { stage, .. } => {
                    println!("  ⏳ [{stage}] Starting...");
                }
                treadle::WorkflowEvent::StageCompleted { stage, .. } => {
                    println!("  ✓ [{stage}] Complete");
                }
                treadle::WorkflowEvent::StageFailed { stage, error, .. } => {
                    eprintln!("  ✗ [{stage}] FAILED: {error}");
                }
                _ => {}
            }
        }
    });

    workflow.advance(&job, &mut store).await?;

    let summary = summary
        .lock()
        .map_err(|_| anyhow::anyhow!("Generation summary lock poisoned"))?
        .ok_or_else(|| anyhow::anyhow!("Generation did not complete; see log for details"))?;

    println!("\n✓ Generation complete");
    println!("  Records:  {}", summary.records);
    println!("  Variants: {}", summary.variants);
    if summary.skipped > 0 {
        println!("  Skipped:  {} (could not produce enough distinct variants)", summary.skipped);
    }
    println!("\nRun 'vehimatch evaluate' to score a search backend against them");

    Ok(())
}
