use treadle::Workflow;

use crate::generate::NoiseGenerationStage;

/// Build the noise generation pipeline.
///
/// # Errors
/// Returns an error if the workflow cannot be built.
pub fn build_pipeline(stage: NoiseGenerationStage) -> treadle::Result<Workflow> {
    Workflow::builder().stage("generate", stage).build()
}
