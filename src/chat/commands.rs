//! Slash command parsing for the chat application.
//!
//! Every input line is either a dialog turn for the backend or, when it starts with `/`, a
//! command that acts on the session locally.

use crate::rating::Thumb;
use crate::types::ApproachType;

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Start a new conversation.
    New,

    /// Resubmit the last failed question with an expanded scope.
    Retry,

    /// Click one of the rating thumbs of the selected answer.
    Rate(Thumb),

    /// Select the n-th (1-based) turn of the conversation.
    Select(usize),

    /// Ask the n-th (1-based) follow-up question of the last answer.
    Followup(usize),

    /// Show the document URL of the n-th (1-based) citation of the selected answer.
    Citation(usize),

    /// Show how the backend arrived at the selected answer.
    Thoughts,

    /// Show the supporting content of the selected answer.
    Sources,

    /// Set the sampling temperature; `None` restores the backend default.
    Temperature(Option<f32>),

    /// Set the number of search results; `None` restores the backend default.
    Top(Option<u32>),

    /// Toggle semantic ranking.
    SemanticRanker(bool),

    /// Toggle semantic captions.
    SemanticCaptions(bool),

    /// Toggle vector search.
    VectorSearch(bool),

    /// Toggle follow-up question suggestions.
    SuggestFollowups(bool),

    /// Exclude a document category; `None` clears the exclusion.
    ExcludeCategory(Option<String>),

    /// Force a classification; `None` lets the backend decide.
    Classify(Option<ApproachType>),

    /// Show the current configuration.
    ShowConfig,

    /// Show the signed-in account.
    WhoAmI,

    /// Sign out and exit.
    Logout,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it should be sent to
/// the backend as a dialog turn.
///
/// # Examples
///
/// ```
/// # use citechat::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/followup 2").is_some());
/// assert!(parse_command("What is the refund policy?").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "new" | "clear" => ChatCommand::New,
        "retry" => ChatCommand::Retry,
        "up" | "like" => ChatCommand::Rate(Thumb::Up),
        "down" | "dislike" => ChatCommand::Rate(Thumb::Down),
        "followup" | "f" => parse_index(argument, ChatCommand::Followup, "/followup"),
        "citation" | "c" => parse_index(argument, ChatCommand::Citation, "/citation"),
        "select" | "s" => parse_index(argument, ChatCommand::Select, "/select"),
        "thoughts" => ChatCommand::Thoughts,
        "sources" => ChatCommand::Sources,
        "temperature" => match argument {
            Some(arg) if arg.eq_ignore_ascii_case("clear") => ChatCommand::Temperature(None),
            Some(arg) => match parse_f32_in_range(arg, 0.0, 1.0) {
                Ok(value) => ChatCommand::Temperature(Some(value)),
                Err(err) => ChatCommand::Invalid(format!("/temperature {err}")),
            },
            None => ChatCommand::Invalid("/temperature requires a value".to_string()),
        },
        "top" => match argument {
            Some(arg) if arg.eq_ignore_ascii_case("clear") => ChatCommand::Top(None),
            Some(arg) => match arg.parse::<u32>() {
                Ok(value) if value > 0 => ChatCommand::Top(Some(value)),
                _ => ChatCommand::Invalid("/top expects a positive integer".to_string()),
            },
            None => ChatCommand::Invalid("/top requires a value".to_string()),
        },
        "semantic" => parse_toggle(argument, ChatCommand::SemanticRanker, "/semantic"),
        "captions" => parse_toggle(argument, ChatCommand::SemanticCaptions, "/captions"),
        "vector" => parse_toggle(argument, ChatCommand::VectorSearch, "/vector"),
        "suggest" => parse_toggle(argument, ChatCommand::SuggestFollowups, "/suggest"),
        "exclude" => match argument {
            Some(arg) if arg.eq_ignore_ascii_case("clear") => ChatCommand::ExcludeCategory(None),
            Some(arg) => ChatCommand::ExcludeCategory(Some(arg.to_string())),
            None => ChatCommand::Invalid("/exclude requires a category".to_string()),
        },
        "classify" => match argument {
            Some(arg) if arg.eq_ignore_ascii_case("clear") => ChatCommand::Classify(None),
            Some(arg) => match arg.parse::<ApproachType>() {
                Ok(approach) => ChatCommand::Classify(Some(approach)),
                Err(err) => ChatCommand::Invalid(format!(
                    "{err} (use structured, unstructured, chit_chat, or clear)"
                )),
            },
            None => ChatCommand::Invalid("/classify requires a classification".to_string()),
        },
        "config" => ChatCommand::ShowConfig,
        "whoami" => ChatCommand::WhoAmI,
        "logout" => ChatCommand::Logout,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

fn parse_index<F>(argument: Option<&str>, constructor: F, name: &str) -> ChatCommand
where
    F: Fn(usize) -> ChatCommand,
{
    match argument {
        Some(arg) => match arg.parse::<usize>() {
            Ok(value) if value > 0 => constructor(value),
            _ => ChatCommand::Invalid(format!("{} expects a number starting at 1", name)),
        },
        None => ChatCommand::Invalid(format!("{} requires a number", name)),
    }
}

fn parse_toggle<F>(argument: Option<&str>, constructor: F, name: &str) -> ChatCommand
where
    F: Fn(bool) -> ChatCommand,
{
    match argument.and_then(parse_on_off) {
        Some(value) => constructor(value),
        None => ChatCommand::Invalid(format!("{} expects 'on' or 'off'", name)),
    }
}

fn parse_f32_in_range(value: &str, min: f32, max: f32) -> Result<f32, String> {
    let parsed: f32 = value
        .parse()
        .map_err(|_| format!("expects a value between {min} and {max}"))?;
    if parsed.is_finite() && parsed >= min && parsed <= max {
        Ok(parsed)
    } else {
        Err(format!("expects a value between {min} and {max}"))
    }
}

fn parse_on_off(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" => Some(true),
        "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /new                   Start a new conversation
  /retry                 Retry the last failed search with an expanded scope
  /select <n>            Select the n-th answer of the conversation
  /up, /down             Rate the selected answer (repeat to clear the rating)
  /followup <n>          Ask the n-th follow-up question of the last answer
  /citation <n>          Show where the selected answer's n-th citation lives
  /thoughts              Show how the selected answer was produced
  /sources               Show the supporting content of the selected answer
  /temperature <v>       Set temperature 0.0-1.0 (use 'clear' to reset)
  /top <n>               Set the number of search results (use 'clear' to reset)
  /semantic on|off       Toggle semantic ranking
  /captions on|off       Toggle semantic captions
  /vector on|off         Toggle vector search
  /suggest on|off        Toggle follow-up question suggestions
  /exclude <category>    Exclude a document category (use 'clear' to reset)
  /classify <type>       Force structured, unstructured or chit_chat (or 'clear')
  /config                Show the current configuration
  /whoami                Show the signed-in account
  /logout                Sign out and exit
  /help                  Show this help message
  /quit                  Exit the application"#
}
