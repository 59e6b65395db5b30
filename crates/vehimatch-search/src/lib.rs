//! Search backends for vehimatch.
//!
//! Defines the narrow contract the evaluator needs from "a backend that
//! can search" and an Elasticsearch adapter implementing it over HTTP.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod backend;
pub mod elasticsearch;
pub mod error;
pub mod year;

pub use backend::SearchBackend;
pub use elasticsearch::{ElasticsearchBackend, ElasticsearchSettings};
pub use error::{SearchError, SearchResult};
pub use year::extract_year_filter;
