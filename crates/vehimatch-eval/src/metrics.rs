//! Per-query outcomes and batch aggregates.

use std::collections::BTreeMap;

use serde::Serialize;
use vehimatch_core::model::NoiseType;

use crate::error::{EvalError, EvalResult};

/// Precision and recall over a batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvaluationMetrics {
    pub precision: f64,
    pub recall: f64,
    pub query_count: usize,
}

impl EvaluationMetrics {
    /// Aggregate `correct` hits out of `query_count` scored queries.
    ///
    /// # Errors
    /// Returns [`EvalError::EmptyBatch`] when `query_count` is zero.
    #[allow(clippy::cast_precision_loss)]
    pub fn from_counts(correct: usize, query_count: usize) -> EvalResult<Self> {
        if query_count == 0 {
            return Err(EvalError::EmptyBatch);
        }
        let ratio = correct as f64 / query_count as f64;
        Ok(Self {
            precision: ratio,
            recall: ratio,
            query_count,
        })
    }
}

/// How one query fared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum QueryStatus {
    Correct,
    Missed,
    TimedOut,
    /// The backend call failed; carries the error text.
    Failed(String),
}

impl QueryStatus {
    pub fn is_correct(&self) -> bool {
        matches!(self, Self::Correct)
    }

    /// Whether the backend call itself went wrong.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::TimedOut | Self::Failed(_))
    }
}

/// The scored result of one noisy query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryOutcome {
    pub text: String,
    pub noise_type: NoiseType,
    pub status: QueryStatus,
    /// Distinct triples returned by the backend.
    pub retrieved: usize,
}

/// Everything an evaluation run learned.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub metrics: EvaluationMetrics,
    pub correct: usize,
    pub timed_out: usize,
    pub failed: usize,
    /// Queries abandoned by cancellation, not part of `metrics.query_count`.
    pub cancelled: usize,
    pub by_noise_type: BTreeMap<NoiseType, EvaluationMetrics>,
    pub mean_retrieved: f64,
    /// Outcomes in input order.
    pub outcomes: Vec<QueryOutcome>,
}

impl EvaluationReport {
    /// Reduce scored outcomes into a report.
    ///
    /// # Errors
    /// [`EvalError::Cancelled`] when nothing was scored but queries were
    /// abandoned, [`EvalError::EmptyBatch`] when there was nothing at all.
    #[allow(clippy::cast_precision_loss)]
    pub fn from_outcomes(outcomes: Vec<QueryOutcome>, cancelled: usize) -> EvalResult<Self> {
        if outcomes.is_empty() && cancelled > 0 {
            return Err(EvalError::Cancelled {
                abandoned: cancelled,
            });
        }

        let mut correct = 0;
        let mut timed_out = 0;
        let mut failed = 0;
        let mut retrieved = 0;
        let mut per_type: BTreeMap<NoiseType, (usize, usize)> = BTreeMap::new();

        for outcome in &outcomes {
            let entry = per_type.entry(outcome.noise_type).or_default();
            entry.1 += 1;
            match outcome.status {
                QueryStatus::Correct => {
                    correct += 1;
                    entry.0 += 1;
                }
                QueryStatus::Missed => {}
                QueryStatus::TimedOut => timed_out += 1,
                QueryStatus::Failed(_) => failed += 1,
            }
            retrieved += outcome.retrieved;
        }

        let metrics = EvaluationMetrics::from_counts(correct, outcomes.len())?;
        let by_noise_type = per_type
            .into_iter()
            .map(|(noise_type, (hits, total))| {
                EvaluationMetrics::from_counts(hits, total).map(|m| (noise_type, m))
            })
            .collect::<EvalResult<_>>()?;

        Ok(Self {
            metrics,
            correct,
            timed_out,
            failed,
            cancelled,
            by_noise_type,
            mean_retrieved: retrieved as f64 / outcomes.len() as f64,
            outcomes,
        })
    }

    /// Queries whose backend call timed out or failed.
    pub fn errored(&self) -> usize {
        self.timed_out + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(noise_type: NoiseType, status: QueryStatus, retrieved: usize) -> QueryOutcome {
        QueryOutcome {
            text: "q".to_string(),
            noise_type,
            status,
            retrieved,
        }
    }

    #[test]
    fn test_metrics_from_counts() {
        let m = EvaluationMetrics::from_counts(3, 4).unwrap();
        assert!((m.precision - 0.75).abs() < f64::EPSILON);
        assert!((m.recall - 0.75).abs() < f64::EPSILON);
        assert_eq!(m.query_count, 4);
    }

    #[test]
    fn test_metrics_empty_batch() {
        assert!(matches!(
            EvaluationMetrics::from_counts(0, 0),
            Err(EvalError::EmptyBatch)
        ));
    }

    #[test]
    fn test_report_counts_statuses() {
        let report = EvaluationReport::from_outcomes(
            vec![
                outcome(NoiseType::Abbrev, QueryStatus::Correct, 3),
                outcome(NoiseType::Abbrev, QueryStatus::Missed, 3),
                outcome(NoiseType::Drop, QueryStatus::TimedOut, 0),
                outcome(NoiseType::Drop, QueryStatus::Failed("boom".to_string()), 0),
            ],
            2,
        )
        .unwrap();

        assert_eq!(report.metrics.query_count, 4);
        assert_eq!(report.correct, 1);
        assert_eq!(report.errored(), 2);
        assert_eq!(report.cancelled, 2);
        assert!((report.metrics.precision - 0.25).abs() < f64::EPSILON);
        assert!((report.mean_retrieved - 1.5).abs() < f64::EPSILON);

        let abbrev = report.by_noise_type[&NoiseType::Abbrev];
        assert!((abbrev.precision - 0.5).abs() < f64::EPSILON);
        let dropped = report.by_noise_type[&NoiseType::Drop];
        assert!(dropped.precision.abs() < f64::EPSILON);
        assert!(!report.by_noise_type.contains_key(&NoiseType::Reorder));
    }

    #[test]
    fn test_report_all_cancelled() {
        let err = EvaluationReport::from_outcomes(Vec::new(), 5).unwrap_err();
        assert!(matches!(err, EvalError::Cancelled { abandoned: 5 }));
    }

    #[test]
    fn test_report_nothing_at_all() {
        let err = EvaluationReport::from_outcomes(Vec::new(), 0).unwrap_err();
        assert!(matches!(err, EvalError::EmptyBatch));
    }

    #[test]
    fn test_status_predicates() {
        assert!(QueryStatus::Correct.is_correct());
        assert!(!QueryStatus::Missed.is_error());
        assert!(QueryStatus::TimedOut.is_error());
        assert!(QueryStatus::Failed("x".to_string()).is_error());
    }
}
