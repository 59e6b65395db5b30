use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::model::record::CanonicalRecord;

/// The corruption strategy that produced a noisy query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseType {
    /// Two adjacent characters of the model swapped.
    TypoModel,
    /// Two adjacent characters of the make swapped.
    TypoMake,
    /// Make replaced by its abbreviation, when one exists.
    Abbrev,
    /// `[year, make, model]` shuffled.
    Reorder,
    /// One of the three tokens omitted.
    Drop,
}

impl NoiseType {
    /// Every strategy, in the order they are drawn from.
    pub const ALL: [Self; 5] = [
        Self::TypoModel,
        Self::TypoMake,
        Self::Abbrev,
        Self::Reorder,
        Self::Drop,
    ];

    /// The name stored in the `noise_type` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TypoModel => "typo_model",
            Self::TypoMake => "typo_make",
            Self::Abbrev => "abbrev",
            Self::Reorder => "reorder",
            Self::Drop => "drop",
        }
    }
}

impl fmt::Display for NoiseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoiseType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidData(format!("unknown noise type: {s}")))
    }
}

/// A corrupted query string whose ground truth is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoisyQuery {
    pub text: String,
    pub noise_type: NoiseType,
    pub truth: CanonicalRecord,
}

impl NoisyQuery {
    #[must_use]
    pub fn new(text: impl Into<String>, noise_type: NoiseType, truth: CanonicalRecord) -> Self {
        Self {
            text: text.into(),
            noise_type,
            truth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_type_round_trip_names() {
        for noise_type in NoiseType::ALL {
            let parsed: NoiseType = noise_type.as_str().parse().unwrap();
            assert_eq!(parsed, noise_type);
        }
    }

    #[test]
    fn test_noise_type_unknown() {
        assert!("scramble".parse::<NoiseType>().is_err());
    }

    #[test]
    fn test_noise_type_serde_matches_column_name() {
        let json = serde_json::to_string(&NoiseType::TypoModel).unwrap();
        assert_eq!(json, "\"typo_model\"");
    }

    #[test]
    fn test_noisy_query_new() {
        let truth = CanonicalRecord::new("Toyota", "Camry", 2015);
        let query = NoisyQuery::new("2015 TOY Camry", NoiseType::Abbrev, truth.clone());
        assert_eq!(query.truth, truth);
        assert_eq!(query.noise_type, NoiseType::Abbrev);
    }
}
