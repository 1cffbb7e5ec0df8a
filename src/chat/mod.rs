//! Interactive chat over the question-answering backend.
//!
//! This module provides the pieces of the terminal REPL built on top of the citechat client
//! library:
//!
//! - [`config`]: CLI argument parsing, the YAML configuration file, and resolution
//! - [`session`]: Conversation state, retries, follow-ups and ratings
//! - [`commands`]: Slash command parsing

mod commands;
mod config;
mod session;

pub use crate::render::{DisplayAnswer, PlainTextRenderer, Renderer, SafeText};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ACCESS_TOKEN_ENV, ChatArgs, ChatConfig, FileConfig, parse_temperature};
pub use session::{ChatSession, SessionStats, Turn, TurnOutcome};
