use serde::{Deserialize, Serialize};
use std::fmt;

/// One real vehicle trim-year.
///
/// The triple itself is the identity. Case is preserved for display;
/// comparisons against search results go through [`CanonicalRecord::matches`],
/// which ignores case and surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub make: String,
    /// May be empty when the source has a make/year without a model.
    pub model: String,
    pub year: i32,
}

impl CanonicalRecord {
    #[must_use]
    pub fn new(make: impl Into<String>, model: impl Into<String>, year: i32) -> Self {
        Self {
            make: make.into(),
            model: model.into(),
            year,
        }
    }

    /// The un-noised query shape: `"{year} {make} {model}"`, omitting an
    /// empty model.
    #[must_use]
    pub fn display_text(&self) -> String {
        join_tokens(&[self.year.to_string(), self.make.clone(), self.model.clone()])
    }

    /// Lower-cased [`display_text`](Self::display_text), the form search
    /// indexes store.
    #[must_use]
    pub fn normalized_text(&self) -> String {
        self.display_text().to_lowercase()
    }

    /// Case-insensitive comparison against a `(make, model, year)` triple.
    #[must_use]
    pub fn matches(&self, make: &str, model: &str, year: i32) -> bool {
        self.year == year
            && normalize(&self.make) == normalize(make)
            && normalize(&self.model) == normalize(model)
    }

    /// Whether two records denote the same vehicle under the matching rule.
    #[must_use]
    pub fn same_vehicle(&self, other: &Self) -> bool {
        self.matches(&other.make, &other.model, other.year)
    }
}

impl fmt::Display for CanonicalRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_text())
    }
}

/// Lower-case and trim a name for matching.
#[must_use]
pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Join tokens with single spaces, skipping empty ones.
#[must_use]
pub fn join_tokens<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens
        .iter()
        .map(|t| t.as_ref().trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
