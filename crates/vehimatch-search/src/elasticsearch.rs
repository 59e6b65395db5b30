//! Elasticsearch search backend.
//!
//! Issues a fuzzy `multi_match` query against an index of canonical
//! vehicle documents. Each document carries `make`, `model`, `year`, a
//! lower-cased `normalized_text` and the `make_aliases` drawn from the
//! alias table; building and populating that index happens elsewhere.
//!
//! Transient failures (connection errors, 5xx, 429) are retried with
//! exponential backoff.

use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use vehimatch_core::model::SearchHit;

use crate::backend::SearchBackend;
use crate::error::{SearchError, SearchResult};

const BACKEND_NAME: &str = "elasticsearch";

/// Connection settings for [`ElasticsearchBackend`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticsearchSettings {
    /// Base URL of the cluster, e.g. `http://localhost:9200`.
    pub url: String,
    /// Index holding the canonical vehicle documents.
    pub index: String,
    /// Basic-auth user, used together with `password`.
    pub username: Option<String>,
    pub password: Option<String>,
    /// API key; takes precedence over basic auth.
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
    /// Retries after the first attempt for transient failures.
    pub max_retries: usize,
}

impl Default for ElasticsearchSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            index: "vehicles".to_string(),
            username: None,
            password: None,
            api_key: None,
            request_timeout_secs: 30,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    hits: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_score")]
    score: Option<f64>,
    #[serde(rename = "_source")]
    source: VehicleSource,
}

#[derive(Debug, Deserialize)]
struct VehicleSource {
    make: String,
    #[serde(default)]
    model: Option<String>,
    year: i32,
}

/// Elasticsearch-backed [`SearchBackend`].
#[derive(Debug, Clone)]
pub struct ElasticsearchBackend {
    http: Client,
    settings: ElasticsearchSettings,
}

impl ElasticsearchBackend {
    /// Create a backend from connection settings.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(settings: ElasticsearchSettings) -> SearchResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .user_agent("vehimatch/0.1.0 (https://github.com/oxur/vehimatch)")
            .build()?;

        Ok(Self { http, settings })
    }

    pub fn settings(&self) -> &ElasticsearchSettings {
        &self.settings
    }

    fn search_url(&self) -> String {
        format!(
            "{}/{}/_search",
            self.settings.url.trim_end_matches('/'),
            self.settings.index
        )
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_secs(2))
            .with_max_times(self.settings.max_retries)
    }

    async fn search_once(&self, body: &Value) -> SearchResult<Vec<SearchHit>> {
        let mut request = self.http.post(self.search_url()).json(body);

        if let Some(key) = &self.settings.api_key {
            request = request.header("Authorization", format!("ApiKey {key}"));
        } else if let (Some(user), Some(pass)) = (&self.settings.username, &self.settings.password)
        {
            request = request.basic_auth(user, Some(pass));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SearchError::Timeout {
                    backend: BACKEND_NAME.to_string(),
                }
            } else {
                SearchError::Request(e)
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SearchError::RateLimited {
                backend: BACKEND_NAME.to_string(),
            });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SearchError::Http {
                backend: BACKEND_NAME.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        parse_hits(&text)
    }
}

#[async_trait]
impl SearchBackend for ElasticsearchBackend {
    fn name(&self) -> &str {
        BACKEND_NAME
    }

    async fn search(
        &self,
        query: &str,
        top_k: usize,
        year_filter: Option<i32>,
    ) -> SearchResult<Vec<SearchHit>> {
        let body = build_query(query, top_k, year_filter);

        (|| async { self.search_once(&body).await })
            .retry(self.backoff())
            .when(SearchError::is_transient)
            .notify(|err, delay| {
                log::warn!("Retrying '{}' in {:?}: {}", query, delay, err);
            })
            .await
    }
}

/// Build the request body for one query.
pub fn build_query(query: &str, top_k: usize, year_filter: Option<i32>) -> Value {
    let mut filters = Vec::new();
    if let Some(year) = year_filter {
        filters.push(json!({ "term": { "year": year } }));
    }

    json!({
        "size": top_k,
        "query": {
            "bool": {
                "must": [{
                    "multi_match": {
                        "query": query,
                        "fields": [
                            "normalized_text^2",
                            "normalized_text.fuzzy",
                            "make^1.5",
                            "model^1.5",
                            "make_aliases"
                        ],
                        "fuzziness": "AUTO",
                        "operator": "or"
                    }
                }],
                "filter": filters
            }
        }
    })
}

/// Map a `_search` response body to hits, keeping the backend's order.
pub fn parse_hits(body: &str) -> SearchResult<Vec<SearchHit>> {
    let response: SearchResponse = serde_json::from_str(body).map_err(|e| SearchError::Parse {
        backend: BACKEND_NAME.to_string(),
        message: e.to_string(),
    })?;

    Ok(response
        .hits
        .hits
        .into_iter()
        .map(|hit| {
            SearchHit::new(
                hit.source.make,
                hit.source.model.unwrap_or_default(),
                hit.source.year,
                hit.score.unwrap_or(0.0),
            )
        })
        .collect())
}
