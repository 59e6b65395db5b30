use serde::{Deserialize, Serialize};

use crate::model::record::CanonicalRecord;

/// One ranked candidate returned by a search backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub score: f64,
}

impl SearchHit {
    #[must_use]
    pub fn new(make: impl Into<String>, model: impl Into<String>, year: i32, score: f64) -> Self {
        Self {
            make: make.into(),
            model: model.into(),
            year,
            score,
        }
    }

    /// Whether this hit denotes the given canonical record.
    #[must_use]
    pub fn is_match(&self, truth: &CanonicalRecord) -> bool {
        truth.matches(&self.make, &self.model, self.year)
    }

    /// The hit's triple, keyed the same way records are matched.
    #[must_use]
    pub fn key(&self) -> (String, String, i32) {
        (
            crate::model::record::normalize(&self.make),
            crate::model::record::normalize(&self.model),
            self.year,
        )
    }
}
