//! Canonical corpus access.
//!
//! The evaluation harness only needs two reads from wherever canonical
//! records live: a stable page of canonical triples and a batch of
//! previously generated noisy queries with their ground truth.

use crate::error::Result;
use crate::model::{CanonicalRecord, NoisyQuery};

/// Read access to the canonical vehicle corpus.
pub trait CorpusAccessor {
    /// A page of canonical records. For a fixed `limit`, non-overlapping
    /// offset windows never return the same record twice.
    fn fetch_canonical(&self, limit: usize, offset: usize) -> Result<Vec<CanonicalRecord>>;

    /// Up to `limit` stored noisy queries, with ground truth resolved to
    /// canonical names.
    fn fetch_labeled_noisy(&self, limit: usize) -> Result<Vec<NoisyQuery>>;

    /// Total number of canonical records.
    fn count_canonical(&self) -> Result<usize>;
}
