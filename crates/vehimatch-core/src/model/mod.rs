pub mod hit;
pub mod ids;
pub mod query;
pub mod record;
pub mod run;

pub use hit::SearchHit;
pub use ids::RunId;
pub use query::{NoiseType, NoisyQuery};
pub use record::CanonicalRecord;
pub use run::EvaluationRun;
