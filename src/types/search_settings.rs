use serde::{Deserialize, Serialize};

/// Search capabilities the backend has enabled.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Whether vector search is available.
    pub vectorization_enabled: bool,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            vectorization_enabled: true,
        }
    }
}
