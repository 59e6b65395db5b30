//! The search backend contract.

use async_trait::async_trait;
use vehimatch_core::model::SearchHit;

use crate::error::SearchResult;

/// Anything that can turn a query string into a ranked list of candidate
/// vehicles.
///
/// Implementations own their connection state and must be safe to call
/// concurrently; the evaluator issues many queries at once against one
/// shared backend.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Short name used in logs and stored evaluation runs.
    fn name(&self) -> &str;

    /// Return at most `top_k` hits for `query`, best first. When
    /// `year_filter` is set, every hit must carry that year.
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        year_filter: Option<i32>,
    ) -> SearchResult<Vec<SearchHit>>;
}
