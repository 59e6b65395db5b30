//! Retrieval evaluation for vehimatch.
//!
//! Issues noisy queries with known ground truth against a search backend,
//! scores each result set with binary relevance, and aggregates precision
//! and recall over the batch.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod error;
pub mod evaluator;
pub mod metrics;
pub mod scoring;

pub use error::{EvalError, EvalResult};
pub use evaluator::{evaluate, Evaluator};
pub use metrics::{EvaluationMetrics, EvaluationReport, QueryOutcome, QueryStatus};
pub use scoring::{precision_recall, Relevance};
