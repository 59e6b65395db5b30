//! The noise generation stage.
//!
//! Walks the canonical corpus page by page, corrupts every record into
//! `variants_per_record` distinct noisy queries and writes each page's
//! variants in one transaction. A record whose variants cannot be made
//! distinct within the attempt budget is logged and skipped.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use treadle::{Stage, StageContext, StageOutcome};
use vehimatch_core::schema::{Database, NoisyVariantRow};
use vehimatch_core::NoiseGenerator;

use crate::config::GenerationSettings;
use crate::error::{EtlError, EtlResult};

/// What a generation run produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GenerationSummary {
    /// Records that received their full set of variants.
    pub records: usize,
    pub variants: usize,
    /// Records skipped because generation was exhausted.
    pub skipped: usize,
}

/// Shared slot the stage fills in when it completes.
pub type SummaryHandle = Arc<Mutex<Option<GenerationSummary>>>;

/// The Generate stage: corrupt canonical records into stored noisy variants.
#[derive(Debug)]
pub struct NoiseGenerationStage {
    db_path: PathBuf,
    generator: NoiseGenerator,
    settings: GenerationSettings,
    summary: SummaryHandle,
}

impl NoiseGenerationStage {
    #[must_use]
    pub fn new(db_path: PathBuf, generator: NoiseGenerator, settings: GenerationSettings) -> Self {
        let generator = generator.with_attempts_per_variant(settings.attempts_per_variant);
        Self {
            db_path,
            generator,
            settings,
            summary: Arc::new(Mutex::new(None)),
        }
    }

    /// A handle to read the summary once the stage has run.
    pub fn summary_handle(&self) -> SummaryHandle {
        Arc::clone(&self.summary)
    }

    fn rng(&self) -> StdRng {
        match self.settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Generate and store variants for the configured slice of the corpus.
    #[allow(clippy::cast_precision_loss)]
    pub fn run_generation<R: Rng + ?Sized>(
        &self,
        db: &Database,
        rng: &mut R,
    ) -> EtlResult<GenerationSummary> {
        if self.settings.batch_size == 0 {
            return Err(EtlError::Config("generation.batch_size must be positive".into()));
        }

        let available = db.count_models()?;
        let total = self
            .settings
            .limit
            .map_or(available, |limit| limit.min(available));
        let per_record = self.settings.variants_per_record;

        log::info!(
            "Generating {} variants per record for {} of {} records",
            per_record,
            total,
            available
        );

        let mut summary = GenerationSummary::default();
        let mut offset = 0;
        let mut batch_number = 1;

        while offset < total {
            let page = self.settings.batch_size.min(total - offset);
            let rows = db.fetch_canonical_rows(page, offset)?;
            if rows.is_empty() {
                break;
            }

            let mut batch = Vec::with_capacity(rows.len() * per_record);
            for row in &rows {
                let record = &row.record;
                match self.generator.generate_variants(
                    rng,
                    &record.model,
                    &record.make,
                    record.year,
                    per_record,
                ) {
                    Ok(variants) => {
                        summary.records += 1;
                        batch.extend(variants.into_iter().map(|v| NoisyVariantRow {
                            noisy_string: v.text,
                            model_id: row.model_id.clone(),
                            make_id: row.make_id.clone(),
                            year: record.year,
                            noise_type: v.noise_type,
                        }));
                    }
                    Err(e) if e.is_record_local() => {
                        log::warn!("Skipping {}: {}", record, e);
                        summary.skipped += 1;
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            let inserted = db.insert_noisy_variants(&batch)?;
            summary.variants += inserted;
            offset += rows.len();

            log::info!(
                "[Batch {}] Processed {} records, inserted {} variants. Total processed: {}/{} ({:.2}%)",
                batch_number,
                rows.len(),
                inserted,
                offset,
                total,
                offset as f64 / total as f64 * 100.0
            );
            batch_number += 1;
        }

        Ok(summary)
    }
}

#[async_trait::async_trait]
impl Stage for NoiseGenerationStage {
    fn name(&self) -> &str {
        "generate"
    }

    async fn execute(
        &self,
        item: &dyn treadle::WorkItem,
        _context: &mut StageContext,
    ) -> treadle::Result<StageOutcome> {
        log::info!("Starting noise generation for job {}", item.id());

        let db = Database::open(&self.db_path).map_err(|e| {
            treadle::TreadleError::StageExecution(format!("Failed to open database: {e}"))
        })?;

        let mut rng = self.rng();
        match self.run_generation(&db, &mut rng) {
            Ok(summary) => {
                log::info!(
                    "Generation complete: {} records, {} variants, {} skipped",
                    summary.records,
                    summary.variants,
                    summary.skipped
                );
                if let Ok(mut slot) = self.summary.lock() {
                    *slot = Some(summary);
                }
                Ok(StageOutcome::Complete)
            }
            Err(e) => Err(treadle::TreadleError::StageExecution(format!(
                "Generation failed: {e}"
            ))),
        }
    }
}
