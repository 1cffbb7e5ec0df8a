// Public modules
pub mod answer;
pub mod auth;
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod error;
pub mod observability;
pub mod rating;
pub mod render;
pub mod types;
pub mod utils;

// Re-exports
pub use answer::{ParsedAnswer, extract_followups, parse_answer};
pub use auth::{Account, AuthConfig, AuthEvent, AuthSession};
pub use client::{ChatBackend, ChatClient};
pub use client_logger::{ClientLogger, StderrLogger};
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use rating::{RatingControl, Thumb};
pub use types::*;
