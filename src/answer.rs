//! Turning a raw chat response into something displayable.
//!
//! The backend embeds suggested follow-up questions in the answer text as `<<<question>>>`.
//! [`parse_answer`] pulls them out, leaving the answer text and the citations ready to render.

use crate::types::{ChatResponse, Citation};

const FOLLOWUP_OPEN: &str = "<<<";
const FOLLOWUP_CLOSE: &str = ">>>";

/// A chat answer split into its display parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedAnswer {
    /// Answer text with follow-up markers removed and surrounding whitespace trimmed.
    pub text: String,

    /// The response's citations, in their original order.
    pub citations: Vec<Citation>,

    /// Follow-up questions, in order of appearance.
    pub followup_questions: Vec<String>,
}

/// Split a chat response into answer text, citations and follow-up questions.
///
/// A marker is `<<<` followed by at least one character that is not `>`, then `>>>`.  Anything
/// that does not form a complete marker, such as an unterminated `<<<`, stays in the text.
pub fn parse_answer(response: &ChatResponse) -> ParsedAnswer {
    let (text, followup_questions) = extract_followups(&response.answer.formatted_answer);
    ParsedAnswer {
        text: text.trim().to_string(),
        citations: response.answer.citations.clone(),
        followup_questions,
    }
}

/// Remove every follow-up marker from `raw`, returning the remaining text and the marker
/// contents.
pub fn extract_followups(raw: &str) -> (String, Vec<String>) {
    let mut text = String::with_capacity(raw.len());
    let mut questions = Vec::new();
    let mut copied_to = 0;
    let mut search_from = 0;
    while let Some(offset) = raw[search_from..].find(FOLLOWUP_OPEN) {
        let open = search_from + offset;
        match marker_at(raw, open) {
            Some((question, end)) => {
                text.push_str(&raw[copied_to..open]);
                questions.push(question.to_string());
                copied_to = end;
                search_from = end;
            }
            // A failed match may still be followed by one starting a character later.
            None => search_from = open + 1,
        }
    }
    text.push_str(&raw[copied_to..]);
    (text, questions)
}

/// Match a complete marker whose opening delimiter starts at `open`.
///
/// Returns the marker content and the byte offset just past the closing delimiter.
fn marker_at(raw: &str, open: usize) -> Option<(&str, usize)> {
    let start = open + FOLLOWUP_OPEN.len();
    let rest = &raw[start..];
    let len = rest.find('>').unwrap_or(rest.len());
    if len == 0 || !rest[len..].starts_with(FOLLOWUP_CLOSE) {
        return None;
    }
    Some((&rest[..len], start + len + FOLLOWUP_CLOSE.len()))
}
