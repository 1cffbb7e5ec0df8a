//! Output rendering for the chat application.
//!
//! Everything that comes back from the backend is untrusted.  It reaches the terminal only
//! as [`SafeText`], which can only be built by [`SafeText::sanitize`]; the [`Renderer`]
//! trait accepts nothing else for backend content.  Sanitizing strips escape sequences and
//! control characters so an answer cannot move the cursor, recolor the terminal, or rewrite
//! what was printed before it.

use std::fmt;
use std::io::{self, Stdout, Write};

use crate::answer::ParsedAnswer;
use crate::types::Rating;

/// ANSI escape code for dim text (used for thought process).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for citations).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for yellow text (used for follow-up questions).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for green text (used for ratings).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors and the retry banner).
const ANSI_RED: &str = "\x1b[31m";

const ESC: char = '\x1b';
const BEL: char = '\x07';

/// Shown when the backend says a failed search may succeed with an expanded scope.
pub const RETRY_PROMPT: &str = "Looks like this search ran into an issue. Would you like me to try again with an expanded scope? (/retry)";

/// Text that is safe to write to a terminal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SafeText(String);

impl SafeText {
    /// Strip escape sequences and control characters other than newline and tab.
    pub fn sanitize(raw: &str) -> Self {
        let mut out = String::with_capacity(raw.len());
        let mut chars = raw.chars().peekable();
        while let Some(c) = chars.next() {
            if c == ESC {
                match chars.next() {
                    // CSI: parameters and intermediates up to a final byte in @..~
                    Some('[') => {
                        for c in chars.by_ref() {
                            if ('@'..='~').contains(&c) {
                                break;
                            }
                        }
                    }
                    // OSC: terminated by BEL or ESC \
                    Some(']') => {
                        while let Some(c) = chars.next() {
                            if c == BEL {
                                break;
                            }
                            if c == ESC {
                                if chars.peek() == Some(&'\\') {
                                    chars.next();
                                }
                                break;
                            }
                        }
                    }
                    _ => {}
                }
                continue;
            }
            if c == '\n' || c == '\t' || !c.is_control() {
                out.push(c);
            }
        }
        Self(out)
    }

    /// The sanitized text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if nothing is left after sanitizing.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SafeText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A parsed answer with every part sanitized for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayAnswer {
    /// Answer text.
    pub text: SafeText,
    /// Citation titles, in display order.
    pub citations: Vec<SafeText>,
    /// Follow-up questions, in display order.
    pub followup_questions: Vec<SafeText>,
}

impl From<&ParsedAnswer> for DisplayAnswer {
    fn from(parsed: &ParsedAnswer) -> Self {
        Self {
            text: SafeText::sanitize(&parsed.text),
            citations: parsed
                .citations
                .iter()
                .map(|citation| {
                    let label = if citation.title.is_empty() {
                        &citation.id
                    } else {
                        &citation.title
                    };
                    SafeText::sanitize(label)
                })
                .collect(),
            followup_questions: parsed
                .followup_questions
                .iter()
                .map(|question| SafeText::sanitize(question))
                .collect(),
        }
    }
}

/// Trait for rendering chat output.
///
/// Backend content is only accepted as [`SafeText`]; `print_info` is for the client's own
/// messages.
pub trait Renderer: Send {
    /// Print an answer and its numbered citations.
    fn print_answer(&mut self, answer: &DisplayAnswer);

    /// Print numbered follow-up questions.
    fn print_followups(&mut self, questions: &[SafeText]);

    /// Print the retry banner for a failed search.
    fn print_retry_prompt(&mut self, message: &SafeText);

    /// Print the rating shown for a turn.
    fn print_rating(&mut self, rating: Rating);

    /// Print how the backend arrived at its answer as labelled sections.
    fn print_thought_process(&mut self, sections: &[(&str, SafeText)]);

    /// Print the supporting content an answer was built from.
    fn print_supporting_content(&mut self, data_points: &[SafeText]);

    /// Print an error message.
    fn print_error(&mut self, error: &SafeText);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer<W: Write + Send = Stdout> {
    out: W,
    use_color: bool,
}

impl PlainTextRenderer<Stdout> {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self::with_writer(io::stdout(), use_color)
    }
}

impl<W: Write + Send> PlainTextRenderer<W> {
    /// Creates a renderer writing to `out`.
    pub fn with_writer(out: W, use_color: bool) -> Self {
        Self { out, use_color }
    }

    /// Consumes the renderer, returning its writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn styled(&mut self, style: &str, text: &str) {
        let _ = if self.use_color {
            writeln!(self.out, "{style}{text}{ANSI_RESET}")
        } else {
            writeln!(self.out, "{text}")
        };
    }

    fn flush(&mut self) {
        let _ = self.out.flush();
    }
}

impl Default for PlainTextRenderer<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> Renderer for PlainTextRenderer<W> {
    fn print_answer(&mut self, answer: &DisplayAnswer) {
        let _ = writeln!(self.out, "{}", answer.text);
        if !answer.citations.is_empty() {
            let _ = writeln!(self.out);
            self.styled(ANSI_CYAN, "Citations:");
            for (idx, title) in answer.citations.iter().enumerate() {
                self.styled(ANSI_CYAN, &format!("  {}. {}", idx + 1, title));
            }
        }
        self.flush();
    }

    fn print_followups(&mut self, questions: &[SafeText]) {
        if questions.is_empty() {
            return;
        }
        self.styled(ANSI_YELLOW, "Follow-up questions:");
        for (idx, question) in questions.iter().enumerate() {
            self.styled(ANSI_YELLOW, &format!("  {}. {}", idx + 1, question));
        }
        self.flush();
    }

    fn print_retry_prompt(&mut self, message: &SafeText) {
        if !message.is_empty() {
            self.styled(ANSI_RED, message.as_str());
        }
        self.styled(ANSI_RED, RETRY_PROMPT);
        self.flush();
    }

    fn print_rating(&mut self, rating: Rating) {
        self.styled(ANSI_GREEN, &format!("Rated: {rating}"));
        self.flush();
    }

    fn print_thought_process(&mut self, sections: &[(&str, SafeText)]) {
        if sections.is_empty() {
            self.print_info("No thought process available for this answer.");
            return;
        }
        for (label, text) in sections {
            let _ = writeln!(self.out, "{label}:");
            self.styled(ANSI_DIM, text.as_str());
        }
        self.flush();
    }

    fn print_supporting_content(&mut self, data_points: &[SafeText]) {
        if data_points.is_empty() {
            self.print_info("No supporting content for this answer.");
            return;
        }
        for (idx, data_point) in data_points.iter().enumerate() {
            self.styled(ANSI_DIM, &format!("[{}] {}", idx + 1, data_point));
        }
        self.flush();
    }

    fn print_error(&mut self, error: &SafeText) {
        self.styled(ANSI_RED, &format!("Error: {error}"));
        self.flush();
    }

    fn print_info(&mut self, info: &str) {
        let _ = writeln!(self.out, "{info}");
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Citation;

    fn rendered(f: impl FnOnce(&mut PlainTextRenderer<Vec<u8>>)) -> String {
        let mut renderer = PlainTextRenderer::with_writer(Vec::new(), false);
        f(&mut renderer);
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    #[test]
    fn sanitize_strips_escape_sequences() {
        let text = SafeText::sanitize("\x1b[2J\x1b[31mred\x1b[0m text");
        assert_eq!(text.as_str(), "red text");
        let text = SafeText::sanitize("\x1b]0;pwned\x07title");
        assert_eq!(text.as_str(), "title");
        let text = SafeText::sanitize("\x1b]8;;http://evil\x1b\\link");
        assert_eq!(text.as_str(), "link");
    }

    #[test]
    fn sanitize_keeps_layout() {
        let text = SafeText::sanitize("line one\n\tindented\r\x08\u{9b}");
        assert_eq!(text.as_str(), "line one\n\tindented");
    }

    #[test]
    fn sanitize_leaves_markup_as_text() {
        let text = SafeText::sanitize("<script>alert(1)</script> é");
        assert_eq!(text.as_str(), "<script>alert(1)</script> é");
    }

    #[test]
    fn answer_with_citations() {
        let parsed = ParsedAnswer {
            text: "The answer.".to_string(),
            citations: vec![
                Citation::new("a", "ua", "Handbook"),
                Citation::new("b.pdf", "ub", ""),
            ],
            followup_questions: vec!["More?".to_string()],
        };
        let display = DisplayAnswer::from(&parsed);
        let out = rendered(|r| {
            r.print_answer(&display);
            r.print_followups(&display.followup_questions);
        });
        assert_eq!(
            out,
            "The answer.\n\nCitations:\n  1. Handbook\n  2. b.pdf\nFollow-up questions:\n  1. More?\n"
        );
    }

    #[test]
    fn retry_banner() {
        let out = rendered(|r| r.print_retry_prompt(&SafeText::sanitize("No results.")));
        assert_eq!(out, format!("No results.\n{RETRY_PROMPT}\n"));
    }

    #[test]
    fn color_wraps_styled_lines() {
        let mut renderer = PlainTextRenderer::with_writer(Vec::new(), true);
        renderer.print_rating(Rating::Up);
        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(out, format!("{ANSI_GREEN}Rated: thumbs up{ANSI_RESET}\n"));
    }

    #[test]
    fn renderer_default_has_color() {
        let renderer = PlainTextRenderer::new();
        assert!(renderer.use_color);
    }
}
