use serde::{Deserialize, Serialize};
use std::fmt;
use treadle::WorkItem;

/// One generation run over the canonical corpus.
///
/// This is the treadle `WorkItem` that flows through the generate stage.
/// Each run gets a fresh id so the state store never treats it as
/// already complete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusJob {
    id: String,
    /// Label shown in progress output.
    pub label: String,
}

impl CorpusJob {
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

impl WorkItem for CorpusJob {
    fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for CorpusJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label, self.id)
    }
}
