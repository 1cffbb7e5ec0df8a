//! Interactive chat over a question-answering backend.
//!
//! This binary provides a REPL for asking questions of a citation-backed backend, following
//! up on its answers, and rating them.
//!
//! # Usage
//!
//! ```bash
//! # Sign in with a token issued by the identity platform
//! CITECHAT_ACCESS_TOKEN=eyJ... citechat --base-url https://qa.example.com
//!
//! # Talk to a local backend without signing in
//! citechat --no-auth --user-id ada
//!
//! # Read settings from a file
//! citechat --config citechat.yaml
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/new` - Start a new conversation
//! - `/retry` - Retry a failed search with an expanded scope
//! - `/select <n>` - Select an earlier answer
//! - `/up`, `/down` - Rate the selected answer
//! - `/followup <n>` - Ask a suggested follow-up question
//! - `/quit` - Exit the application

use std::sync::Arc;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use citechat::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, SafeText,
    help_text, parse_command,
};
use citechat::{Account, AuthEvent, AuthSession, ChatClient, StderrLogger};

/// Main entry point for the citechat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("citechat [OPTIONS]");
    let config = ChatConfig::from_args(args)?;
    let mut renderer = PlainTextRenderer::with_color(config.use_color);

    let mut auth = AuthSession::initialize(config.auth.clone())?;
    if auth.cache_discarded() {
        renderer.print_info("Ignoring an unreadable session cache; it is replaced at sign-in.");
    }
    if let Some(token) = &config.access_token {
        let account = Account::from_access_token(token)?;
        auth.handle_event(AuthEvent::LoginSuccess(account))?;
    }
    if config.require_auth {
        if let Err(err) = auth.require_active() {
            renderer.print_error(&SafeText::sanitize(&err.to_string()));
            renderer.print_info(&format!(
                "Pass --token, set {}, or run with --no-auth.",
                citechat::chat::ACCESS_TOKEN_ENV
            ));
            std::process::exit(1);
        }
    }

    let mut client = ChatClient::with_options(config.base_url.clone(), config.timeout)?;
    client = if auth.active_account().is_some() {
        client.with_auth(&auth)?
    } else {
        client.with_access_token(None)?
    };
    if config.verbose {
        client = client.with_logger(Arc::new(StderrLogger));
    }

    let user_id = config.effective_user_id(auth.active_account().map(|a| a.username.as_str()));
    let mut session = ChatSession::new(client, user_id, config.overrides.clone());
    let mut rl = DefaultEditor::new()?;

    println!(
        "citechat ({} as {})",
        session.backend().base_url(),
        session.user_id()
    );
    println!("Type /help for commands, /quit to exit\n");

    loop {
        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Check for slash commands
                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::New => {
                            session.new_conversation();
                            renderer.print_info("Started a new conversation.");
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Retry => match session.retry().await {
                            Ok(turn) => turn.render(&mut renderer, config.show_followups),
                            Err(err) => print_failure(&mut renderer, &err),
                        },
                        ChatCommand::Followup(n) => match session.followup(n).await {
                            Ok(turn) => turn.render(&mut renderer, config.show_followups),
                            Err(err) => print_failure(&mut renderer, &err),
                        },
                        ChatCommand::Rate(thumb) => match session.rate(thumb).await {
                            Ok(rating) => renderer.print_rating(rating),
                            Err(err) => print_failure(&mut renderer, &err),
                        },
                        ChatCommand::Select(n) => match session.select(n - 1) {
                            Ok(turn) => {
                                renderer.print_info(&format!(
                                    "Selected: {}",
                                    SafeText::sanitize(&turn.question)
                                ));
                                renderer.print_rating(turn.rating);
                            }
                            Err(err) => print_failure(&mut renderer, &err),
                        },
                        ChatCommand::Citation(n) => match session.citation(n) {
                            Ok(url) => renderer.print_info(url.as_str()),
                            Err(err) => print_failure(&mut renderer, &err),
                        },
                        ChatCommand::Thoughts => match session.thought_process() {
                            Some(sections) => {
                                let sections = sections
                                    .iter()
                                    .map(|(label, text)| (*label, SafeText::sanitize(text)))
                                    .collect::<Vec<_>>();
                                renderer.print_thought_process(&sections);
                            }
                            None => renderer.print_thought_process(&[]),
                        },
                        ChatCommand::Sources => {
                            let data_points = session
                                .supporting_content()
                                .iter()
                                .map(|data_point| SafeText::sanitize(data_point))
                                .collect::<Vec<_>>();
                            renderer.print_supporting_content(&data_points);
                        }
                        ChatCommand::Temperature(value) => {
                            session.overrides_mut().temperature = value;
                            match value {
                                Some(v) => {
                                    renderer.print_info(&format!("temperature set to {v:.2}"))
                                }
                                None => renderer.print_info("temperature reset to backend default"),
                            }
                        }
                        ChatCommand::Top(value) => {
                            session.overrides_mut().top = value;
                            match value {
                                Some(v) => renderer.print_info(&format!("top set to {v}")),
                                None => renderer.print_info("top reset to backend default"),
                            }
                        }
                        ChatCommand::SemanticRanker(on) => {
                            session.overrides_mut().semantic_ranker = Some(on);
                            renderer.print_info(&format!("semantic ranker {}", on_off(on)));
                        }
                        ChatCommand::SemanticCaptions(on) => {
                            session.overrides_mut().semantic_captions = Some(on);
                            renderer.print_info(&format!("semantic captions {}", on_off(on)));
                        }
                        ChatCommand::VectorSearch(on) => {
                            if on && !session.backend().search_settings().vectorization_enabled {
                                renderer.print_info("the backend does not support vector search");
                                continue;
                            }
                            session.overrides_mut().vector_search = Some(on);
                            renderer.print_info(&format!("vector search {}", on_off(on)));
                        }
                        ChatCommand::SuggestFollowups(on) => {
                            session.overrides_mut().suggest_followup_questions = Some(on);
                            renderer.print_info(&format!("follow-up suggestions {}", on_off(on)));
                        }
                        ChatCommand::ExcludeCategory(category) => {
                            match &category {
                                Some(c) => renderer.print_info(&format!("excluding category {c}")),
                                None => renderer.print_info("no category excluded"),
                            }
                            session.overrides_mut().exclude_category = category;
                        }
                        ChatCommand::Classify(approach) => {
                            session.overrides_mut().classification_override = approach;
                            match approach {
                                Some(a) => renderer.print_info(&format!("classification set to {a}")),
                                None => renderer.print_info("classification left to the backend"),
                            }
                        }
                        ChatCommand::ShowConfig => {
                            print_config(&session, &config);
                        }
                        ChatCommand::WhoAmI => match auth.active_account() {
                            Some(account) => print_account(account),
                            None => renderer.print_info("Not signed in."),
                        },
                        ChatCommand::Logout => {
                            match auth.handle_event(AuthEvent::Logout) {
                                Ok(()) => println!("Signed out. Goodbye!"),
                                Err(err) => print_failure(&mut renderer, &err),
                            }
                            break;
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&SafeText::sanitize(&message));
                        }
                    }
                    continue;
                }

                // Regular question - send to the backend
                match session.ask(line).await {
                    Ok(turn) => turn.render(&mut renderer, config.show_followups),
                    Err(err) => print_failure(&mut renderer, &err),
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&SafeText::sanitize(&format!("Input error: {}", err)));
                break;
            }
        }
    }

    Ok(())
}

fn print_failure(renderer: &mut PlainTextRenderer, err: &citechat::Error) {
    renderer.print_error(&SafeText::sanitize(&err.to_string()));
}

fn print_config(session: &ChatSession<ChatClient>, config: &ChatConfig) {
    let stats = session.stats();
    let overrides = &stats.overrides;
    println!("    Current Configuration:");
    println!("      Backend: {}", session.backend().base_url());
    println!("      Timeout: {}s", session.backend().timeout().as_secs());
    println!("      User: {}", stats.user_id);
    println!("      Conversation: {}", stats.conversation_id);
    println!(
        "      Turns: {} ({} answered, {} failed, {} rated)",
        stats.turns, stats.answered, stats.failed, stats.rated
    );
    println!("      Temperature: {}", describe(overrides.temperature));
    println!("      Top: {}", describe(overrides.top));
    println!("      Semantic ranker: {}", describe_toggle(overrides.semantic_ranker));
    println!(
        "      Semantic captions: {}",
        describe_toggle(overrides.semantic_captions)
    );
    println!("      Vector search: {}", describe_toggle(overrides.vector_search));
    println!(
        "      Follow-up suggestions: {}",
        describe_toggle(overrides.suggest_followup_questions)
    );
    println!(
        "      Excluded category: {}",
        overrides.exclude_category.as_deref().unwrap_or("(none)")
    );
    println!(
        "      Classification: {}",
        describe(overrides.classification_override)
    );
    println!(
        "      Follow-up questions: {}",
        if config.show_followups {
            "shown"
        } else {
            "hidden"
        }
    );
}

fn print_account(account: &Account) {
    for line in account_lines(account) {
        println!("{line}");
    }
}

fn account_lines(account: &Account) -> Vec<String> {
    let mut lines = vec![format!(
        "    Signed in as {}",
        SafeText::sanitize(&account.username)
    )];
    if let Some(name) = &account.name {
        lines.push(format!("      Name: {}", SafeText::sanitize(name)));
    }
    lines.push(format!(
        "      Account: {}",
        SafeText::sanitize(&account.home_account_id)
    ));
    lines.push(match account.expires_at {
        Some(expires_at) => format!("      Expires: {}", expires_at),
        None => "      Expires: (unknown)".to_string(),
    });
    lines
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

fn describe<T: std::fmt::Display>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "default".to_string())
}

fn describe_toggle(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "on",
        Some(false) => "off",
        None => "default",
    }
}
