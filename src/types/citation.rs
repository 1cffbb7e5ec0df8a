use serde::{Deserialize, Serialize};

/// Path prefix under which the backend serves cited source documents.
pub const CONTENT_PATH_PREFIX: &str = "/content/";

/// A source document referenced by an answer.
///
/// Citations are kept in the order the backend returned them; that order is the display
/// order and says nothing about relevance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Identifier of the source document.
    pub id: String,

    /// Location of the source as reported by the backend.
    #[serde(default)]
    pub url: String,

    /// A short title for display.
    #[serde(default)]
    pub title: String,
}

impl Citation {
    /// Create a new citation.
    pub fn new(id: impl Into<String>, url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            title: title.into(),
        }
    }

    /// The backend path for downloading or displaying this citation's document.
    pub fn file_path(&self) -> String {
        citation_file_path(&self.id)
    }
}

/// Resolve a citation identifier to its `/content/<id>` path.
pub fn citation_file_path(citation_id: &str) -> String {
    format!("{CONTENT_PATH_PREFIX}{citation_id}")
}
