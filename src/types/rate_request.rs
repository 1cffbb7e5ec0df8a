use serde::{Deserialize, Serialize, Serializer};

use crate::types::{DialogRequest, Rating};

const NO_REQUEST: &str = "no request";
const NO_RESPONSE: &str = "no response";

/// Feedback on one answered dialog turn, sent to `/rate`.
#[derive(Debug, Clone, PartialEq)]
pub struct RateRequest {
    /// The turn being rated.
    pub dialog: DialogRequest,

    /// The rating; unset withdraws a previous rating.
    pub rating: Rating,

    /// The search query that produced the answer, if known.
    pub request: Option<String>,

    /// The answer text being rated.
    pub response: Option<String>,
}

impl RateRequest {
    /// Create a rating for the given turn.
    pub fn new(dialog: DialogRequest, rating: Rating) -> Self {
        Self {
            dialog,
            rating,
            request: None,
            response: None,
        }
    }

    /// Attach the query that produced the answer.
    pub fn with_request(mut self, request: Option<String>) -> Self {
        self.request = request;
        self
    }

    /// Attach the rated answer text.
    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = Some(response.into());
        self
    }
}

#[derive(Serialize)]
struct RateRequestBody<'a> {
    user_id: &'a str,
    conversation_id: &'a str,
    dialog_id: &'a str,
    rating: Rating,
    request: &'a str,
    response: &'a str,
}

impl Serialize for RateRequest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        RateRequestBody {
            user_id: &self.dialog.user_id,
            conversation_id: &self.dialog.conversation_id,
            dialog_id: &self.dialog.dialog_id,
            rating: self.rating,
            request: self.request.as_deref().unwrap_or(NO_REQUEST),
            response: self.response.as_deref().unwrap_or(NO_RESPONSE),
        }
        .serialize(serializer)
    }
}

/// The body returned by `/rate`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateResponse {
    /// The rated turn.
    #[serde(default)]
    pub dialog_id: String,

    /// Backend output lines.
    #[serde(default)]
    pub output: Vec<String>,

    /// Error message, set when the call failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn body_substitutes_missing_text() {
        let request = RateRequest::new(DialogRequest::new("u", "c", "d"), Rating::Unset);
        assert_eq!(
            to_value(&request).unwrap(),
            json!({
                "user_id": "u",
                "conversation_id": "c",
                "dialog_id": "d",
                "rating": null,
                "request": "no request",
                "response": "no response"
            })
        );
    }

    #[test]
    fn body_with_text() {
        let request = RateRequest::new(DialogRequest::new("u", "c", "d"), Rating::Down)
            .with_request(Some("search terms".to_string()))
            .with_response("The answer.");
        let body = to_value(&request).unwrap();
        assert_eq!(body["rating"], json!(false));
        assert_eq!(body["request"], json!("search terms"));
        assert_eq!(body["response"], json!("The answer."));
    }

    #[test]
    fn response_decodes() {
        let response: RateResponse =
            serde_json::from_str(r#"{"dialog_id":"d","output":["ok"]}"#).unwrap();
        assert_eq!(response.dialog_id, "d");
        assert_eq!(response.output, vec!["ok".to_string()]);
        assert!(response.error.is_none());
    }
}
