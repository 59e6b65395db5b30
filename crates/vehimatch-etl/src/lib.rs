//! Noise generation pipeline and configuration for vehimatch.
//!
//! Implements corpus-wide noisy variant generation as a treadle `Stage`
//! and the layered configuration shared by every command.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod generate;
pub mod pipeline;
pub mod work_item;

pub use config::{Config, EvaluationSettings, GenerationSettings};
pub use error::{EtlError, EtlResult};
pub use generate::{GenerationSummary, NoiseGenerationStage, SummaryHandle};
pub use pipeline::build_pipeline;
pub use work_item::CorpusJob;
