use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::RunId;

/// A persisted summary of one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRun {
    pub id: RunId,
    /// Name of the search backend that was evaluated.
    pub backend: String,
    pub top_k: usize,
    pub query_count: usize,
    pub correct: usize,
    /// Queries whose backend call failed or timed out.
    pub errored: usize,
    /// Queries abandoned by cancellation (not part of `query_count`).
    pub cancelled: usize,
    pub precision: f64,
    pub recall: f64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl EvaluationRun {
    /// Wall-clock duration of the run.
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
