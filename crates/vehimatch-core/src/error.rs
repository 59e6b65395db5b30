use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid data: {0}")]
    InvalidData(String),

    /// The alias resource could not be read at start-up.
    #[error("alias resource missing: {}", path.display())]
    AliasResourceMissing { path: PathBuf },

    /// The noise generator ran out of attempts before collecting enough
    /// distinct variants for one record.
    #[error(
        "generation exhausted for '{record}': {produced}/{requested} distinct variants after {attempts} attempts"
    )]
    GenerationExhausted {
        record: String,
        requested: usize,
        produced: usize,
        attempts: usize,
    },
}

impl Error {
    /// Returns `true` when the error only affects a single record and a
    /// batch may continue past it.
    pub fn is_record_local(&self) -> bool {
        matches!(self, Self::GenerationExhausted { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
