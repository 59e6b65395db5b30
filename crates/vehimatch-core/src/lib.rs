//! Core domain model for vehimatch.
//!
//! This crate defines the canonical vehicle record and the noisy query
//! types derived from it, the make abbreviation table, the noise
//! generator that corrupts canonical records into human-like queries,
//! and the SQLite schema backing the canonical corpus.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod alias;
pub mod corpus;
pub mod error;
pub mod model;
pub mod noise;
pub mod schema;

pub use alias::AliasTable;
pub use corpus::CorpusAccessor;
pub use error::{Error, Result};
pub use noise::NoiseGenerator;
