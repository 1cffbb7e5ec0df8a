use serde::{Deserialize, Serialize};

use crate::types::{ApproachType, Citation};

/// The answer part of a chat response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Raw answer text, possibly carrying `<<<follow-up>>>` markers.
    #[serde(default)]
    pub formatted_answer: String,

    /// Sources referenced by the answer, in display order.
    #[serde(default)]
    pub citations: Vec<Citation>,

    /// Prompt the backend used to generate its search query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_generation_prompt: Option<String>,

    /// The search query the backend ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    /// Raw result of the search query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_result: Option<String>,
}

impl Answer {
    /// Create an answer with text and citations only.
    pub fn new(formatted_answer: impl Into<String>, citations: Vec<Citation>) -> Self {
        Self {
            formatted_answer: formatted_answer.into(),
            citations,
            ..Self::default()
        }
    }
}

/// The body returned by `/chat`, on success and on failure alike.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The answer.
    #[serde(default)]
    pub answer: Answer,

    /// How the backend classified the question.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::types::approach_type::deserialize_lenient"
    )]
    pub classification: Option<ApproachType>,

    /// Supporting content the answer was built from.
    #[serde(default)]
    pub data_points: Vec<String>,

    /// The backend considers resubmitting with an expanded scope worthwhile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_retry: Option<bool>,

    /// Classification the backend recommends for a retry.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::types::approach_type::deserialize_lenient"
    )]
    pub suggested_classification: Option<ApproachType>,

    /// Error message, set when the call failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatResponse {
    /// Create a response around an answer.
    pub fn new(answer: Answer) -> Self {
        Self {
            answer,
            ..Self::default()
        }
    }

    /// True when the backend exposed anything about how it reached the answer.
    pub fn has_thought_process(&self) -> bool {
        self.classification.is_some()
            || self.answer.query.is_some()
            || self.answer.query_generation_prompt.is_some()
            || self.answer.query_result.is_some()
    }

    /// True when the response carries supporting content.
    pub fn has_supporting_content(&self) -> bool {
        !self.data_points.is_empty()
    }
}
