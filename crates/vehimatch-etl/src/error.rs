//! Error types for the generation pipeline and configuration.

use thiserror::Error;

/// Errors raised while preparing or running a generation batch.
#[derive(Debug, Error)]
pub enum EtlError {
    /// An error propagated from the core layer (database, alias table).
    #[error("core error: {0}")]
    Core(#[from] vehimatch_core::Error),

    /// Settings that cannot drive a run.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl EtlError {
    /// Returns `true` when the alias resource could not be loaded, which
    /// leaves nothing sensible to run.
    pub fn is_startup_fatal(&self) -> bool {
        matches!(
            self,
            Self::Core(vehimatch_core::Error::AliasResourceMissing { .. }) | Self::Config(_)
        )
    }
}

/// Convenience alias for pipeline results.
pub type EtlResult<T> = std::result::Result<T, EtlError>;
