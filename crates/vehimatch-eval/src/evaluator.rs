//! The evaluation loop.
//!
//! Queries fan out to the backend with at most `concurrency` calls in
//! flight. Each call is bounded by a timeout, and a failed or timed-out
//! call is scored as a miss rather than aborting the batch. Results are
//! reduced in one place once every scheduled query has returned.
//!
//! Cancellation is cooperative: queries not yet started when the token
//! fires are abandoned, while calls already in flight run to completion
//! or time out.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use vehimatch_core::model::NoisyQuery;
use vehimatch_search::{extract_year_filter, SearchBackend};

use crate::error::{EvalError, EvalResult};
use crate::metrics::{EvaluationMetrics, EvaluationReport, QueryOutcome, QueryStatus};
use crate::scoring::precision_recall;

/// Default number of backend calls in flight.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Default per-query timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Drives a batch of noisy queries against a search backend.
#[derive(Debug, Clone)]
pub struct Evaluator {
    top_k: usize,
    concurrency: usize,
    timeout: Duration,
    cancel: CancellationToken,
}

impl Evaluator {
    /// An evaluator asking the backend for `top_k` hits per query.
    pub fn new(top_k: usize) -> Self {
        Self {
            top_k,
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Observe an externally owned cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// A handle that cancels this evaluator's runs.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Evaluate `queries` against `backend`.
    ///
    /// # Errors
    /// [`EvalError::EmptyBatch`] when `queries` is empty and
    /// [`EvalError::Cancelled`] when cancellation left nothing scored.
    /// Backend failures never surface here.
    pub async fn evaluate<B>(&self, queries: &[NoisyQuery], backend: &B) -> EvalResult<EvaluationReport>
    where
        B: SearchBackend + ?Sized,
    {
        if queries.is_empty() {
            return Err(EvalError::EmptyBatch);
        }

        log::info!(
            "Evaluating {} queries against {} (top_k={}, concurrency={})",
            queries.len(),
            backend.name(),
            self.top_k,
            self.concurrency
        );

        let results: Vec<(usize, Option<QueryOutcome>)> = stream::iter(queries.iter().enumerate())
            .map(|(idx, query)| async move {
                if self.cancel.is_cancelled() {
                    return (idx, None);
                }
                (idx, Some(self.run_query(query, backend).await))
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut slots: Vec<Option<QueryOutcome>> = vec![None; queries.len()];
        for (idx, outcome) in results {
            slots[idx] = outcome;
        }
        let cancelled = slots.iter().filter(|slot| slot.is_none()).count();
        let outcomes: Vec<QueryOutcome> = slots.into_iter().flatten().collect();

        if cancelled > 0 {
            log::warn!(
                "Evaluation cancelled: {} of {} queries abandoned",
                cancelled,
                queries.len()
            );
        }

        let report = EvaluationReport::from_outcomes(outcomes, cancelled)?;
        log::info!(
            "Evaluated {} queries: precision {:.3}, recall {:.3}, {} errored",
            report.metrics.query_count,
            report.metrics.precision,
            report.metrics.recall,
            report.errored()
        );
        Ok(report)
    }

    async fn run_query<B>(&self, query: &NoisyQuery, backend: &B) -> QueryOutcome
    where
        B: SearchBackend + ?Sized,
    {
        let year_filter = extract_year_filter(&query.text);
        let call = backend.search(&query.text, self.top_k, year_filter);

        let (status, retrieved) = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(hits)) => {
                let relevance = precision_recall(&hits, &query.truth);
                let status = if relevance.correct {
                    QueryStatus::Correct
                } else {
                    QueryStatus::Missed
                };
                (status, relevance.retrieved)
            }
            Ok(Err(e)) if e.is_timeout() => {
                log::warn!("Query '{}' timed out in {}: {}", query.text, backend.name(), e);
                (QueryStatus::TimedOut, 0)
            }
            Ok(Err(e)) => {
                log::warn!("Query '{}' failed in {}: {}", query.text, backend.name(), e);
                (QueryStatus::Failed(e.to_string()), 0)
            }
            Err(_) => {
                log::warn!(
                    "Query '{}' timed out after {:?} in {}",
                    query.text,
                    self.timeout,
                    backend.name()
                );
                (QueryStatus::TimedOut, 0)
            }
        };

        QueryOutcome {
            text: query.text.clone(),
            noise_type: query.noise_type,
            status,
            retrieved,
        }
    }
}

/// Evaluate `queries` with default concurrency and timeout, returning only
/// the aggregate metrics.
///
/// # Errors
/// See [`Evaluator::evaluate`].
pub async fn evaluate<B>(queries: &[NoisyQuery], backend: &B, top_k: usize) -> EvalResult<EvaluationMetrics>
where
    B: SearchBackend + ?Sized,
{
    Evaluator::new(top_k)
        .evaluate(queries, backend)
        .await
        .map(|report| report.metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use vehimatch_core::model::{CanonicalRecord, NoiseType, SearchHit};
    use vehimatch_search::{SearchError, SearchResult};

    /// Answers every query with a fixed hit list.
    struct FixedBackend {
        hits: Vec<SearchHit>,
        calls: AtomicUsize,
    }

    impl FixedBackend {
        fn new(hits: Vec<SearchHit>) -> Self {
            Self {
                hits,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SearchBackend for FixedBackend {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn search(
            &self,
            _query: &str,
            top_k: usize,
            _year_filter: Option<i32>,
        ) -> SearchResult<Vec<SearchHit>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.hits.iter().take(top_k).cloned().collect())
        }
    }

    /// Echoes the truth back when the query text contains "good", fails
    /// on "bad", and stalls on "slow".
    struct ScriptedBackend {
        seen_years: Mutex<Vec<Option<i32>>>,
    }

    #[async_trait]
    impl SearchBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn search(
            &self,
            query: &str,
            _top_k: usize,
            year_filter: Option<i32>,
        ) -> SearchResult<Vec<SearchHit>> {
            self.seen_years.lock().unwrap().push(year_filter);
            if query.contains("bad") {
                return Err(SearchError::Http {
                    backend: "scripted".to_string(),
                    status: 500,
                    message: "boom".to_string(),
                });
            }
            if query.contains("slow") {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            if query.contains("good") {
                return Ok(vec![SearchHit::new("Toyota", "Camry", 2015, 1.0)]);
            }
            Ok(Vec::new())
        }
    }

    fn camry_query(text: &str, noise_type: NoiseType) -> NoisyQuery {
        NoisyQuery::new(text, noise_type, CanonicalRecord::new("Toyota", "Camry", 2015))
    }

    fn batch(n: usize) -> Vec<NoisyQuery> {
        (0..n)
            .map(|i| camry_query(&format!("2015 Toyota Camry {i}"), NoiseType::ALL[i % 5]))
            .collect()
    }

    #[tokio::test]
    async fn test_all_correct() {
        let backend = FixedBackend::new(vec![SearchHit::new("Toyota", "Camry", 2015, 0.9)]);
        let metrics = evaluate(&batch(12), &backend, 3).await.unwrap();
        assert!((metrics.precision - 1.0).abs() < f64::EPSILON);
        assert!((metrics.recall - 1.0).abs() < f64::EPSILON);
        assert_eq!(metrics.query_count, 12);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 12);
    }

    #[tokio::test]
    async fn test_none_correct() {
        let backend = FixedBackend::new(vec![SearchHit::new("Honda", "Civic", 2015, 0.9)]);
        let metrics = evaluate(&batch(7), &backend, 3).await.unwrap();
        assert!(metrics.precision.abs() < f64::EPSILON);
        assert!(metrics.recall.abs() < f64::EPSILON);
        assert_eq!(metrics.query_count, 7);
    }

    #[tokio::test]
    async fn test_truth_below_top_hit_is_correct() {
        let backend = FixedBackend::new(vec![
            SearchHit::new("Toyota", "Camry", 2015, 0.9),
            SearchHit::new("Honda", "Civic", 2015, 0.4),
        ]);
        let report = Evaluator::new(3)
            .evaluate(&batch(1), &backend)
            .await
            .unwrap();
        assert_eq!(report.correct, 1);
        assert_eq!(report.outcomes[0].retrieved, 2);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let backend = FixedBackend::new(Vec::new());
        let err = evaluate(&[], &backend, 3).await.unwrap_err();
        assert!(matches!(err, EvalError::EmptyBatch));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failures_and_timeouts_score_as_misses() {
        let backend = ScriptedBackend {
            seen_years: Mutex::new(Vec::new()),
        };
        let queries = vec![
            camry_query("2015 good Camry", NoiseType::TypoMake),
            camry_query("2015 bad Camry", NoiseType::TypoModel),
            camry_query("slow Camry", NoiseType::Drop),
            camry_query("Camry nothing", NoiseType::Reorder),
        ];

        let report = Evaluator::new(3)
            .with_timeout(Duration::from_millis(50))
            .evaluate(&queries, &backend)
            .await
            .unwrap();

        assert_eq!(report.metrics.query_count, 4);
        assert_eq!(report.correct, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.timed_out, 1);
        assert!((report.metrics.precision - 0.25).abs() < f64::EPSILON);

        assert_eq!(report.outcomes[0].status, QueryStatus::Correct);
        assert!(matches!(report.outcomes[1].status, QueryStatus::Failed(_)));
        assert_eq!(report.outcomes[2].status, QueryStatus::TimedOut);
        assert_eq!(report.outcomes[3].status, QueryStatus::Missed);
    }

    #[tokio::test]
    async fn test_year_filter_extracted_from_query_text() {
        let backend = ScriptedBackend {
            seen_years: Mutex::new(Vec::new()),
        };
        let queries = vec![
            camry_query("Camry 2015 Toyota", NoiseType::Reorder),
            camry_query("Toyota Camry", NoiseType::Drop),
        ];
        Evaluator::new(3)
            .with_concurrency(1)
            .evaluate(&queries, &backend)
            .await
            .unwrap();

        let seen = backend.seen_years.lock().unwrap().clone();
        assert_eq!(seen, vec![Some(2015), None]);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let backend = FixedBackend::new(Vec::new());
        let evaluator = Evaluator::new(3);
        evaluator.cancellation_token().cancel();

        let err = evaluator.evaluate(&batch(4), &backend).await.unwrap_err();
        assert!(matches!(err, EvalError::Cancelled { abandoned: 4 }));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    /// Cancels the shared token after its first call.
    struct CancellingBackend {
        cancel: CancellationToken,
    }

    #[async_trait]
    impl SearchBackend for CancellingBackend {
        fn name(&self) -> &str {
            "cancelling"
        }

        async fn search(
            &self,
            _query: &str,
            _top_k: usize,
            _year_filter: Option<i32>,
        ) -> SearchResult<Vec<SearchHit>> {
            self.cancel.cancel();
            Ok(vec![SearchHit::new("Toyota", "Camry", 2015, 1.0)])
        }
    }

    #[tokio::test]
    async fn test_cancellation_abandons_remaining_queries() {
        let cancel = CancellationToken::new();
        let backend = CancellingBackend {
            cancel: cancel.clone(),
        };
        let report = Evaluator::new(3)
            .with_concurrency(1)
            .with_cancellation(cancel)
            .evaluate(&batch(5), &backend)
            .await
            .unwrap();

        assert_eq!(report.metrics.query_count, 1);
        assert_eq!(report.cancelled, 4);
        assert_eq!(report.correct, 1);
    }

    /// Holds each call open briefly and records the peak number of calls
    /// in flight at once.
    struct TrackingBackend {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    impl TrackingBackend {
        fn new() -> Self {
            Self {
                current: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SearchBackend for TrackingBackend {
        fn name(&self) -> &str {
            "tracking"
        }

        async fn search(
            &self,
            _query: &str,
            _top_k: usize,
            _year_filter: Option<i32>,
        ) -> SearchResult<Vec<SearchHit>> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(vec![SearchHit::new("Toyota", "Camry", 2015, 1.0)])
        }
    }

    #[tokio::test]
    async fn test_concurrency_bounds_calls_in_flight() {
        let backend = TrackingBackend::new();
        let queries = batch(40);

        let report = Evaluator::new(3)
            .with_concurrency(4)
            .evaluate(&queries, &backend)
            .await
            .unwrap();

        let peak = backend.peak.load(Ordering::SeqCst);
        assert!(peak <= 4, "peak in flight was {peak}");
        assert!(peak > 1, "calls never overlapped");
        assert_eq!(report.metrics.query_count, 40);
        assert!((report.metrics.precision - 1.0).abs() < f64::EPSILON);

        let texts: Vec<&str> = report.outcomes.iter().map(|o| o.text.as_str()).collect();
        let expected: Vec<&str> = queries.iter().map(|q| q.text.as_str()).collect();
        assert_eq!(texts, expected);
    }

    /// Cancels the shared token once `trigger` calls have started, then
    /// answers every call after a short delay.
    struct CancelAfterBackend {
        cancel: CancellationToken,
        trigger: usize,
        started: AtomicUsize,
    }

    #[async_trait]
    impl SearchBackend for CancelAfterBackend {
        fn name(&self) -> &str {
            "cancel-after"
        }

        async fn search(
            &self,
            _query: &str,
            _top_k: usize,
            _year_filter: Option<i32>,
        ) -> SearchResult<Vec<SearchHit>> {
            if self.started.fetch_add(1, Ordering::SeqCst) + 1 == self.trigger {
                self.cancel.cancel();
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(vec![SearchHit::new("Toyota", "Camry", 2015, 1.0)])
        }
    }

    #[tokio::test]
    async fn test_cancellation_scores_calls_already_in_flight() {
        let cancel = CancellationToken::new();
        let backend = CancelAfterBackend {
            cancel: cancel.clone(),
            trigger: 3,
            started: AtomicUsize::new(0),
        };

        let report = Evaluator::new(3)
            .with_concurrency(3)
            .with_cancellation(cancel)
            .evaluate(&batch(9), &backend)
            .await
            .unwrap();

        assert_eq!(backend.started.load(Ordering::SeqCst), 3);
        assert_eq!(report.metrics.query_count, 3);
        assert_eq!(report.correct, 3);
        assert_eq!(report.cancelled, 6);
        assert!(report
            .outcomes
            .iter()
            .all(|o| o.status == QueryStatus::Correct));
    }
}
