//! Logging trait for chat client operations.
//!
//! This module provides the [`ClientLogger`] trait that allows users to capture
//! and log all API interactions passing through the [`ChatClient`](crate::ChatClient).

use std::io::{self, Write};

use crate::{ChatRequest, ChatResponse, Error, RateRequest, RateResponse};

/// A trait for logging chat client operations.
///
/// Implement this trait to capture and record all API interactions.  Every method has an empty
/// default, so implementations only override what they care about.
///
/// # Example
///
/// ```rust,ignore
/// use citechat::{ChatRequest, ClientLogger};
///
/// struct QuestionLog;
///
/// impl ClientLogger for QuestionLog {
///     fn log_chat_request(&self, request: &ChatRequest) {
///         println!("asked: {}", request.text);
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Log a chat request just before it is sent.
    fn log_chat_request(&self, _request: &ChatRequest) {}

    /// Log a successful chat response.
    fn log_chat_response(&self, _request: &ChatRequest, _response: &ChatResponse) {}

    /// Log a rating just before it is sent.
    fn log_rate_request(&self, _request: &RateRequest) {}

    /// Log a successful rating response.
    fn log_rate_response(&self, _request: &RateRequest, _response: &RateResponse) {}

    /// Log a failed call to `endpoint`.
    fn log_error(&self, _endpoint: &str, _error: &Error) {}
}

/// Writes one line per client operation to stderr.
#[derive(Debug, Default)]
pub struct StderrLogger;

impl StderrLogger {
    fn line(&self, args: std::fmt::Arguments<'_>) {
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "[citechat] {args}");
    }
}

impl ClientLogger for StderrLogger {
    fn log_chat_request(&self, request: &ChatRequest) {
        self.line(format_args!(
            "chat request conversation={} dialog={} overrides={}",
            request.dialog.conversation_id,
            request.dialog.dialog_id,
            serde_json::to_string(&request.overrides).unwrap_or_default()
        ));
    }

    fn log_chat_response(&self, request: &ChatRequest, response: &ChatResponse) {
        let classification = response
            .classification
            .map(|c| c.to_string())
            .unwrap_or_else(|| "none".to_string());
        self.line(format_args!(
            "chat response dialog={} classification={} citations={} data_points={}",
            request.dialog.dialog_id,
            classification,
            response.answer.citations.len(),
            response.data_points.len()
        ));
    }

    fn log_rate_request(&self, request: &RateRequest) {
        self.line(format_args!(
            "rate request dialog={} rating={:?}",
            request.dialog.dialog_id,
            request.rating.as_option()
        ));
    }

    fn log_rate_response(&self, _request: &RateRequest, response: &RateResponse) {
        self.line(format_args!(
            "rate response dialog={} output={:?}",
            response.dialog_id, response.output
        ));
    }

    fn log_error(&self, endpoint: &str, error: &Error) {
        self.line(format_args!("{endpoint} failed: {error}"));
    }
}
