use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one dialog turn within a conversation.
///
/// The same identifiers are sent with the chat request and with any later rating of its
/// answer, which is how the backend correlates the two.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogRequest {
    /// The user asking the question.
    pub user_id: String,

    /// The conversation this turn belongs to.
    pub conversation_id: String,

    /// This turn.
    pub dialog_id: String,
}

impl DialogRequest {
    /// Create a dialog request from explicit identifiers.
    pub fn new(
        user_id: impl Into<String>,
        conversation_id: impl Into<String>,
        dialog_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            conversation_id: conversation_id.into(),
            dialog_id: dialog_id.into(),
        }
    }

    /// Start a new conversation for the user with fresh identifiers.
    pub fn new_conversation(user_id: impl Into<String>) -> Self {
        Self::new(
            user_id,
            Uuid::new_v4().to_string(),
            Uuid::new_v4().to_string(),
        )
    }

    /// The next turn of the same conversation.
    pub fn next_turn(&self) -> Self {
        Self {
            user_id: self.user_id.clone(),
            conversation_id: self.conversation_id.clone(),
            dialog_id: Uuid::new_v4().to_string(),
        }
    }
}
