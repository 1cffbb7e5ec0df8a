//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which holds one conversation with the
//! backend: the turns asked so far, their answers or failures, and their ratings.

use url::Url;

use crate::answer::{ParsedAnswer, parse_answer};
use crate::client::ChatBackend;
use crate::error::{Error, Result};
use crate::observability::{ANSWER_FOLLOWUPS, SESSION_RETRIES};
use crate::rating::{Thumb, toggled};
use crate::render::{DisplayAnswer, Renderer, SafeText};
use crate::types::{
    ApproachType, ChatRequest, ChatRequestOverrides, ChatResponse, DialogRequest, RateRequest,
    Rating,
};

/// What came back for a turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The backend answered.
    Answered {
        /// The response as received.
        response: Box<ChatResponse>,
        /// The response split for display.
        parsed: ParsedAnswer,
    },
    /// The backend rejected the turn.
    Failed {
        /// The backend's message.
        message: String,
        /// Whether the backend offered a retry with an expanded scope.
        retryable: bool,
    },
}

/// One question and what came back for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    /// Identifiers the turn was sent with.
    pub dialog: DialogRequest,
    /// The question as asked.
    pub question: String,
    /// The answer or failure.
    pub outcome: TurnOutcome,
    /// The rating the backend has accepted for this turn.
    pub rating: Rating,
}

impl Turn {
    /// The parsed answer, if the turn was answered.
    pub fn parsed(&self) -> Option<&ParsedAnswer> {
        match &self.outcome {
            TurnOutcome::Answered { parsed, .. } => Some(parsed),
            TurnOutcome::Failed { .. } => None,
        }
    }

    /// The raw response, if the turn was answered.
    pub fn response(&self) -> Option<&ChatResponse> {
        match &self.outcome {
            TurnOutcome::Answered { response, .. } => Some(response),
            TurnOutcome::Failed { .. } => None,
        }
    }

    /// Returns true if the turn failed with a retry offer.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.outcome,
            TurnOutcome::Failed {
                retryable: true,
                ..
            }
        )
    }

    /// Render the turn: the answer with its citations and follow-ups, or the failure.
    pub fn render(&self, renderer: &mut dyn Renderer, show_followups: bool) {
        match &self.outcome {
            TurnOutcome::Answered { parsed, .. } => {
                let display = DisplayAnswer::from(parsed);
                renderer.print_answer(&display);
                if show_followups {
                    renderer.print_followups(&display.followup_questions);
                }
            }
            TurnOutcome::Failed { message, retryable } => {
                let message = SafeText::sanitize(message);
                if *retryable {
                    renderer.print_retry_prompt(&message);
                } else {
                    renderer.print_error(&message);
                }
            }
        }
    }
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// The user the session asks as.
    pub user_id: String,
    /// The current conversation.
    pub conversation_id: String,
    /// Number of turns in the conversation.
    pub turns: usize,
    /// Turns that were answered.
    pub answered: usize,
    /// Turns that failed.
    pub failed: usize,
    /// Turns carrying a rating.
    pub rated: usize,
    /// Overrides sent with every turn.
    pub overrides: ChatRequestOverrides,
}

/// A chat session that manages conversation state and API interactions.
pub struct ChatSession<B: ChatBackend> {
    backend: B,
    conversation: DialogRequest,
    overrides: ChatRequestOverrides,
    turns: Vec<Turn>,
    selected: Option<usize>,
    suggested_classification: Option<ApproachType>,
}

impl<B: ChatBackend> ChatSession<B> {
    /// Creates a session starting a new conversation for `user_id`.
    pub fn new(backend: B, user_id: impl Into<String>, overrides: ChatRequestOverrides) -> Self {
        Self {
            backend,
            conversation: DialogRequest::new_conversation(user_id),
            overrides,
            turns: Vec::new(),
            selected: None,
            suggested_classification: None,
        }
    }

    /// The backend this session talks to.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Ask a question in the current conversation.
    ///
    /// A failure the backend reports for the turn is recorded as a failed turn and returned
    /// as `Ok`; the caller displays it inline.  Transport failures and a pending request for
    /// this conversation are returned as errors and leave no turn behind.
    pub async fn ask(&mut self, question: &str) -> Result<&Turn> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::validation(
                "question must not be empty",
                Some("dialog".to_string()),
            ));
        }
        let overrides = self.overrides.clone();
        self.send(question.to_string(), overrides).await
    }

    /// Resubmit the last question after a retryable failure.
    ///
    /// The retry asks the backend for the classification it last suggested, widening the
    /// search beyond what failed.
    pub async fn retry(&mut self) -> Result<&Turn> {
        let Some(last) = self.turns.last().filter(|turn| turn.is_retryable()) else {
            return Err(Error::validation("nothing to retry", None));
        };
        let question = last.question.clone();
        let classification = self
            .suggested_classification
            .or(self.overrides.classification_override);
        let overrides = self
            .overrides
            .clone()
            .with_classification_override(classification);
        SESSION_RETRIES.click();
        self.send(question, overrides).await
    }

    /// Ask the n-th (1-based) follow-up question of the last answer.
    pub async fn followup(&mut self, n: usize) -> Result<&Turn> {
        let question = self
            .last_answered()
            .and_then(|turn| turn.parsed())
            .and_then(|parsed| n.checked_sub(1).and_then(|i| parsed.followup_questions.get(i)))
            .cloned()
            .ok_or_else(|| {
                Error::validation(format!("no follow-up question {n}"), Some("n".to_string()))
            })?;
        ANSWER_FOLLOWUPS.click();
        self.ask(&question).await
    }

    async fn send(&mut self, question: String, overrides: ChatRequestOverrides) -> Result<&Turn> {
        let dialog = self.conversation.next_turn();
        let request = ChatRequest::new(dialog.clone(), question.clone()).with_overrides(overrides);
        let outcome = match self.backend.chat(&request).await {
            Ok(response) => {
                if response.suggested_classification.is_some() {
                    self.suggested_classification = response.suggested_classification;
                }
                let parsed = parse_answer(&response);
                TurnOutcome::Answered {
                    response: Box::new(response),
                    parsed,
                }
            }
            Err(Error::Chat { message, retryable }) => TurnOutcome::Failed { message, retryable },
            Err(err) => return Err(err),
        };
        self.turns.push(Turn {
            dialog,
            question,
            outcome,
            rating: Rating::Unset,
        });
        self.selected = None;
        Ok(&self.turns[self.turns.len() - 1])
    }

    /// Click a rating thumb on the selected answer.
    ///
    /// The new rating is sent to the backend and shown only once the backend accepts it.
    pub async fn rate(&mut self, thumb: Thumb) -> Result<Rating> {
        let idx = self
            .selected_index()
            .ok_or_else(|| Error::validation("no answer to rate", None))?;
        self.rate_turn(idx, thumb).await
    }

    /// Select the answered turn at `idx` (0-based) for rating, citations, thought process and
    /// supporting content.  Asking a new question selects the latest answer again.
    pub fn select(&mut self, idx: usize) -> Result<&Turn> {
        match self.turns.get(idx) {
            Some(turn) if turn.parsed().is_some() => {
                self.selected = Some(idx);
                Ok(turn)
            }
            Some(_) => Err(Error::validation(
                format!("turn {} has no answer", idx + 1),
                Some("idx".to_string()),
            )),
            None => Err(Error::validation(
                format!("no turn {}", idx + 1),
                Some("idx".to_string()),
            )),
        }
    }

    /// The selected answered turn, defaulting to the latest one.
    pub fn selected(&self) -> Option<&Turn> {
        self.selected_index().map(|idx| &self.turns[idx])
    }

    fn selected_index(&self) -> Option<usize> {
        self.selected
            .or_else(|| self.turns.iter().rposition(|turn| turn.parsed().is_some()))
    }

    /// Click a rating thumb on the turn at `idx`.
    pub async fn rate_turn(&mut self, idx: usize, thumb: Thumb) -> Result<Rating> {
        let turn = self
            .turns
            .get(idx)
            .ok_or_else(|| Error::validation(format!("no turn {idx}"), Some("idx".to_string())))?;
        let Some(response) = turn.response() else {
            return Err(Error::validation(
                "only answered turns can be rated",
                Some("idx".to_string()),
            ));
        };

        let requested = toggled(turn.rating, thumb);
        let request = RateRequest::new(turn.dialog.clone(), requested)
            .with_request(response.answer.query.clone())
            .with_response(response.answer.formatted_answer.clone());
        self.backend.rate(&request).await?;
        self.turns[idx].rating = requested;
        Ok(requested)
    }

    /// Start a new conversation, forgetting the current turns.
    pub fn new_conversation(&mut self) {
        self.conversation = DialogRequest::new_conversation(self.conversation.user_id.clone());
        self.turns.clear();
        self.selected = None;
        self.suggested_classification = None;
    }

    /// Where the document of the n-th (1-based) citation of the selected answer lives.
    pub fn citation(&self, n: usize) -> Result<Url> {
        let citation = self
            .selected()
            .and_then(|turn| turn.parsed())
            .and_then(|parsed| n.checked_sub(1).and_then(|i| parsed.citations.get(i)))
            .ok_or_else(|| Error::validation(format!("no citation {n}"), Some("n".to_string())))?;
        self.backend.citation_url(&citation.id)
    }

    /// How the backend arrived at the selected answer, as labelled sections.
    ///
    /// Returns `None` when there is no answer or it carries nothing to show.
    pub fn thought_process(&self) -> Option<Vec<(&'static str, String)>> {
        let response = self.selected()?.response()?;
        if !response.has_thought_process() {
            return None;
        }
        let mut sections = Vec::new();
        if let Some(classification) = response.classification {
            sections.push(("Classification", classification.to_string()));
        }
        if let Some(prompt) = &response.answer.query_generation_prompt {
            sections.push(("Query generation prompt", prompt.clone()));
        }
        if let Some(query) = &response.answer.query {
            sections.push(("Query", query.clone()));
        }
        if let Some(result) = &response.answer.query_result {
            sections.push(("Query result", result.clone()));
        }
        Some(sections)
    }

    /// The supporting content of the selected answer.
    pub fn supporting_content(&self) -> &[String] {
        self.selected()
            .and_then(|turn| turn.response())
            .map(|response| response.data_points.as_slice())
            .unwrap_or(&[])
    }

    /// The most recent answered turn.
    pub fn last_answered(&self) -> Option<&Turn> {
        self.turns.iter().rev().find(|turn| turn.parsed().is_some())
    }

    /// All turns of the current conversation.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The user the session asks as.
    pub fn user_id(&self) -> &str {
        &self.conversation.user_id
    }

    /// The current conversation id.
    pub fn conversation_id(&self) -> &str {
        &self.conversation.conversation_id
    }

    /// Overrides sent with every turn.
    pub fn overrides(&self) -> &ChatRequestOverrides {
        &self.overrides
    }

    /// Overrides sent with every turn, for mutation.
    pub fn overrides_mut(&mut self) -> &mut ChatRequestOverrides {
        &mut self.overrides
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            user_id: self.conversation.user_id.clone(),
            conversation_id: self.conversation.conversation_id.clone(),
            turns: self.turns.len(),
            answered: self.turns.iter().filter(|t| t.parsed().is_some()).count(),
            failed: self.turns.iter().filter(|t| t.parsed().is_none()).count(),
            rated: self.turns.iter().filter(|t| !t.rating.is_unset()).count(),
            overrides: self.overrides.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;
    use crate::render::PlainTextRenderer;
    use crate::types::{Answer, Citation, RateResponse};

    #[derive(Default)]
    struct ScriptedBackend {
        chats: Mutex<VecDeque<Result<ChatResponse>>>,
        rates: Mutex<VecDeque<Result<RateResponse>>>,
        chat_requests: Mutex<Vec<ChatRequest>>,
        rate_requests: Mutex<Vec<RateRequest>>,
    }

    impl ScriptedBackend {
        fn chat_returns(self, result: Result<ChatResponse>) -> Self {
            self.chats.lock().unwrap().push_back(result);
            self
        }

        fn rate_returns(self, result: Result<RateResponse>) -> Self {
            self.rates.lock().unwrap().push_back(result);
            self
        }
    }

    #[async_trait::async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
            self.chat_requests.lock().unwrap().push(request.clone());
            self.chats
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected chat call")
        }

        async fn rate(&self, request: &RateRequest) -> Result<RateResponse> {
            self.rate_requests.lock().unwrap().push(request.clone());
            self.rates
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected rate call")
        }

        fn citation_url(&self, citation_id: &str) -> Result<Url> {
            Ok(Url::parse("https://qa.example.com/")?.join(&format!("content/{citation_id}"))?)
        }
    }

    fn answer(text: &str) -> ChatResponse {
        let mut response = ChatResponse::new(Answer::new(
            text,
            vec![Citation::new("doc-1", "u1", "Handbook")],
        ));
        response.answer.query = Some("handbook refunds".to_string());
        response.data_points = vec!["Refunds within 30 days.".to_string()];
        response
    }

    fn rated(dialog_id: &str) -> Result<RateResponse> {
        Ok(RateResponse {
            dialog_id: dialog_id.to_string(),
            output: vec!["ok".to_string()],
            error: None,
        })
    }

    #[tokio::test]
    async fn ask_records_answer() {
        let backend =
            ScriptedBackend::default().chat_returns(Ok(answer("Yes. <<<How long?>>>")));
        let mut session = ChatSession::new(backend, "ada", ChatRequestOverrides::default());
        let turn = session.ask("  Can I get a refund? ").await.unwrap();
        assert_eq!(turn.question, "Can I get a refund?");
        assert_eq!(turn.parsed().unwrap().text, "Yes.");
        assert_eq!(turn.rating, Rating::Unset);

        let requests = session.backend().chat_requests.lock().unwrap();
        assert_eq!(requests[0].dialog.user_id, "ada");
        assert_eq!(requests[0].dialog.conversation_id, session.conversation_id());
        assert_eq!(requests[0].text, "Can I get a refund?");
    }

    #[tokio::test]
    async fn empty_question_rejected() {
        let mut session =
            ChatSession::new(ScriptedBackend::default(), "ada", ChatRequestOverrides::default());
        assert!(session.ask("   ").await.unwrap_err().is_validation());
        assert!(session.turns().is_empty());
    }

    #[tokio::test]
    async fn each_turn_gets_its_own_dialog_id() {
        let backend = ScriptedBackend::default()
            .chat_returns(Ok(answer("one")))
            .chat_returns(Ok(answer("two")));
        let mut session = ChatSession::new(backend, "ada", ChatRequestOverrides::default());
        session.ask("first").await.unwrap();
        session.ask("second").await.unwrap();
        let turns = session.turns();
        assert_ne!(turns[0].dialog.dialog_id, turns[1].dialog.dialog_id);
        assert_eq!(turns[0].dialog.conversation_id, turns[1].dialog.conversation_id);
    }

    #[tokio::test]
    async fn chat_failure_becomes_failed_turn() {
        let backend =
            ScriptedBackend::default().chat_returns(Err(Error::chat("No documents found.", true)));
        let mut session = ChatSession::new(backend, "ada", ChatRequestOverrides::default());
        let turn = session.ask("obscure question").await.unwrap();
        assert!(turn.is_retryable());
        assert_eq!(session.stats().failed, 1);
    }

    #[tokio::test]
    async fn transport_failure_is_an_error() {
        let backend =
            ScriptedBackend::default().chat_returns(Err(Error::connection("refused", None)));
        let mut session = ChatSession::new(backend, "ada", ChatRequestOverrides::default());
        assert!(session.ask("hello").await.unwrap_err().is_connection());
        assert!(session.turns().is_empty());
    }

    #[tokio::test]
    async fn retry_uses_suggested_classification() {
        let mut suggesting = answer("Partial answer.");
        suggesting.suggested_classification = Some(ApproachType::Unstructured);
        let backend = ScriptedBackend::default()
            .chat_returns(Ok(suggesting))
            .chat_returns(Err(Error::chat("Nothing matched.", true)))
            .chat_returns(Ok(answer("Found it.")));
        let mut session = ChatSession::new(
            backend,
            "ada",
            ChatRequestOverrides::new().with_top(Some(3)),
        );
        session.ask("first").await.unwrap();
        session.ask("second").await.unwrap();
        let turn = session.retry().await.unwrap();
        assert_eq!(turn.question, "second");
        assert_eq!(turn.parsed().unwrap().text, "Found it.");

        let requests = session.backend().chat_requests.lock().unwrap();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1].overrides.classification_override, None);
        assert_eq!(
            requests[2].overrides.classification_override,
            Some(ApproachType::Unstructured)
        );
        assert_eq!(requests[2].overrides.top, Some(3));
        assert_ne!(requests[1].dialog.dialog_id, requests[2].dialog.dialog_id);
    }

    #[tokio::test]
    async fn retry_needs_retryable_failure() {
        let backend = ScriptedBackend::default()
            .chat_returns(Err(Error::chat("Bad question.", false)));
        let mut session = ChatSession::new(backend, "ada", ChatRequestOverrides::default());
        assert!(session.retry().await.unwrap_err().is_validation());
        session.ask("q").await.unwrap();
        assert!(session.retry().await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn followup_asks_the_question() {
        let backend = ScriptedBackend::default()
            .chat_returns(Ok(answer("Yes. <<<How long?>>> <<<Who approves?>>>")))
            .chat_returns(Ok(answer("The manager.")));
        let mut session = ChatSession::new(backend, "ada", ChatRequestOverrides::default());
        session.ask("Refunds?").await.unwrap();
        assert!(session.followup(3).await.unwrap_err().is_validation());
        assert!(session.followup(0).await.unwrap_err().is_validation());
        let turn = session.followup(2).await.unwrap();
        assert_eq!(turn.question, "Who approves?");
    }

    #[tokio::test]
    async fn rating_applied_after_backend_accepts() {
        let backend = ScriptedBackend::default()
            .chat_returns(Ok(answer("Yes.")))
            .rate_returns(rated("d"))
            .rate_returns(rated("d"));
        let mut session = ChatSession::new(backend, "ada", ChatRequestOverrides::default());
        session.ask("Refunds?").await.unwrap();

        assert_eq!(session.rate(Thumb::Up).await.unwrap(), Rating::Up);
        assert_eq!(session.turns()[0].rating, Rating::Up);
        assert_eq!(session.rate(Thumb::Up).await.unwrap(), Rating::Unset);
        assert_eq!(session.turns()[0].rating, Rating::Unset);

        let requests = session.backend().rate_requests.lock().unwrap();
        assert_eq!(requests[0].rating, Rating::Up);
        assert_eq!(requests[0].request.as_deref(), Some("handbook refunds"));
        assert_eq!(requests[0].response.as_deref(), Some("Yes."));
        assert_eq!(requests[0].dialog, session.turns()[0].dialog);
        assert_eq!(requests[1].rating, Rating::Unset);
    }

    #[tokio::test]
    async fn rating_kept_when_backend_refuses() {
        let backend = ScriptedBackend::default()
            .chat_returns(Ok(answer("Yes.")))
            .rate_returns(Err(Error::api(500, "rating store down")));
        let mut session = ChatSession::new(backend, "ada", ChatRequestOverrides::default());
        session.ask("Refunds?").await.unwrap();
        let err = session.rate(Thumb::Down).await.unwrap_err();
        assert_eq!(err.message(), "rating store down");
        assert_eq!(session.turns()[0].rating, Rating::Unset);
    }

    #[tokio::test]
    async fn nothing_to_rate() {
        let backend =
            ScriptedBackend::default().chat_returns(Err(Error::chat("failed", false)));
        let mut session = ChatSession::new(backend, "ada", ChatRequestOverrides::default());
        assert!(session.rate(Thumb::Up).await.unwrap_err().is_validation());
        session.ask("q").await.unwrap();
        assert!(session.rate(Thumb::Up).await.unwrap_err().is_validation());
        assert!(session.rate_turn(0, Thumb::Up).await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn citations_thoughts_and_sources() {
        let mut response = answer("Yes.");
        response.classification = Some(ApproachType::Unstructured);
        let backend = ScriptedBackend::default().chat_returns(Ok(response));
        let mut session = ChatSession::new(backend, "ada", ChatRequestOverrides::default());
        assert!(session.thought_process().is_none());
        assert!(session.supporting_content().is_empty());
        assert!(session.citation(1).is_err());

        session.ask("Refunds?").await.unwrap();
        assert_eq!(
            session.citation(1).unwrap().as_str(),
            "https://qa.example.com/content/doc-1"
        );
        assert!(session.citation(2).unwrap_err().is_validation());
        assert_eq!(
            session.thought_process().unwrap(),
            vec![
                ("Classification", "unstructured".to_string()),
                ("Query", "handbook refunds".to_string()),
            ]
        );
        assert_eq!(
            session.supporting_content(),
            &["Refunds within 30 days.".to_string()]
        );
    }

    #[tokio::test]
    async fn new_conversation_resets() {
        let backend = ScriptedBackend::default().chat_returns(Ok(answer("Yes.")));
        let mut session = ChatSession::new(backend, "ada", ChatRequestOverrides::default());
        session.ask("q").await.unwrap();
        let before = session.conversation_id().to_string();
        session.new_conversation();
        assert_ne!(session.conversation_id(), before);
        assert_eq!(session.user_id(), "ada");
        assert!(session.turns().is_empty());
        assert!(session.last_answered().is_none());
    }

    #[tokio::test]
    async fn overrides_sent_with_turns() {
        let backend = ScriptedBackend::default().chat_returns(Ok(answer("Yes.")));
        let mut session = ChatSession::new(backend, "ada", ChatRequestOverrides::default());
        session.overrides_mut().vector_search = Some(false);
        session.overrides_mut().exclude_category = Some("legal".to_string());
        session.ask("q").await.unwrap();
        let requests = session.backend().chat_requests.lock().unwrap();
        assert_eq!(requests[0].overrides.vector_search, Some(false));
        assert_eq!(requests[0].overrides.exclude_category.as_deref(), Some("legal"));
    }

    #[tokio::test]
    async fn render_turns() {
        let backend = ScriptedBackend::default()
            .chat_returns(Ok(answer("Yes. <<<How long?>>>")))
            .chat_returns(Err(Error::chat("No documents.", true)));
        let mut session = ChatSession::new(backend, "ada", ChatRequestOverrides::default());
        session.ask("a").await.unwrap();
        session.ask("b").await.unwrap();

        let mut renderer = PlainTextRenderer::with_writer(Vec::new(), false);
        session.turns()[0].render(&mut renderer, false);
        session.turns()[1].render(&mut renderer, true);
        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(out.starts_with("Yes.\n\nCitations:\n  1. Handbook\n"));
        assert!(!out.contains("How long?"));
        assert!(out.contains("No documents.\n"));
        assert!(out.contains("expanded scope"));
    }

    #[tokio::test]
    async fn selection_drives_panels_and_rating() {
        let mut first = answer("First.");
        first.answer.query = Some("first query".to_string());
        first.data_points = vec!["first source".to_string()];
        first.answer.citations = vec![Citation::new("first.pdf", "", "")];
        let backend = ScriptedBackend::default()
            .chat_returns(Ok(first))
            .chat_returns(Err(Error::chat("failed", false)))
            .chat_returns(Ok(answer("Second.")))
            .chat_returns(Ok(answer("Third.")))
            .rate_returns(rated("d"));
        let mut session = ChatSession::new(backend, "ada", ChatRequestOverrides::default());
        assert!(session.selected().is_none());
        assert!(session.select(0).unwrap_err().is_validation());

        session.ask("one").await.unwrap();
        session.ask("two").await.unwrap();
        session.ask("three").await.unwrap();
        assert_eq!(session.selected().unwrap().question, "three");

        assert!(session.select(1).unwrap_err().is_validation());
        assert!(session.select(7).unwrap_err().is_validation());
        assert_eq!(session.select(0).unwrap().question, "one");
        assert_eq!(session.selected().unwrap().question, "one");
        assert_eq!(session.supporting_content(), &["first source".to_string()]);
        assert_eq!(
            session.thought_process().unwrap(),
            vec![("Query", "first query".to_string())]
        );
        assert!(
            session
                .citation(1)
                .unwrap()
                .as_str()
                .ends_with("/content/first.pdf")
        );

        assert_eq!(session.rate(Thumb::Down).await.unwrap(), Rating::Down);
        assert_eq!(session.turns()[0].rating, Rating::Down);
        assert_eq!(session.turns()[3].rating, Rating::Unset);
        let dialog = session.turns()[0].dialog.clone();
        assert_eq!(session.backend().rate_requests.lock().unwrap()[0].dialog, dialog);

        session.ask("four").await.unwrap();
        assert_eq!(session.selected().unwrap().question, "four");
    }
}
