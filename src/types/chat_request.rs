use serde::{Deserialize, Serialize};

use crate::types::{ApproachType, DialogRequest};

/// Per-request switches forwarded to the backend's retrieval pipeline.
///
/// Unset fields are omitted so the backend applies its own defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatRequestOverrides {
    /// Use semantic ranking of search results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_ranker: Option<bool>,

    /// Use semantic captions instead of whole passages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_captions: Option<bool>,

    /// Number of search results to retrieve.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<u32>,

    /// Sampling temperature for answer generation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Document category to leave out of the search.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_category: Option<String>,

    /// Ask the backend to embed `<<<follow-up>>>` questions in the answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggest_followup_questions: Option<bool>,

    /// Force a classification instead of letting the backend decide.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification_override: Option<ApproachType>,

    /// Use vector search in addition to keyword search.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_search: Option<bool>,
}

impl ChatRequestOverrides {
    /// Returns overrides with nothing set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the classification override.
    pub fn with_classification_override(mut self, approach: Option<ApproachType>) -> Self {
        self.classification_override = approach;
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the number of search results.
    pub fn with_top(mut self, top: Option<u32>) -> Self {
        self.top = top;
        self
    }
}

/// The body of a `/chat` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Identifiers of the turn being asked.
    #[serde(flatten)]
    pub dialog: DialogRequest,

    /// The user's message.
    #[serde(rename = "dialog")]
    pub text: String,

    /// Per-request overrides; always sent, possibly empty.
    #[serde(default)]
    pub overrides: ChatRequestOverrides,
}

impl ChatRequest {
    /// Create a new chat request without overrides.
    pub fn new(dialog: DialogRequest, text: impl Into<String>) -> Self {
        Self {
            dialog,
            text: text.into(),
            overrides: ChatRequestOverrides::default(),
        }
    }

    /// Attach overrides to the request.
    pub fn with_overrides(mut self, overrides: ChatRequestOverrides) -> Self {
        self.overrides = overrides;
        self
    }
}
