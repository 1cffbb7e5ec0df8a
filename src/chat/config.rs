//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg`, an optional YAML configuration
//! file, and the resolved [`ChatConfig`].  Command-line values win over the file, which wins
//! over environment variables and built-in defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use arrrg_derive::CommandLine;
use serde::Deserialize;

use crate::auth::AuthConfig;
use crate::error::{Error, Result};
use crate::types::ChatRequestOverrides;

/// Environment variable holding a bearer token for the backend.
pub const ACCESS_TOKEN_ENV: &str = "CITECHAT_ACCESS_TOKEN";

const DEFAULT_USER_ID: &str = "anonymous";

/// Command-line arguments for the citechat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Backend base URL.
    #[arrrg(optional, "Backend base URL (default: $CITECHAT_BASE_URL or http://localhost:8000/)", "URL")]
    pub base_url: Option<String>,

    /// User id sent with every dialog turn.
    #[arrrg(optional, "User id (default: the signed-in account)", "USER")]
    pub user_id: Option<String>,

    /// YAML configuration file.
    #[arrrg(optional, "YAML configuration file", "FILE")]
    pub config: Option<String>,

    /// Access token obtained from the identity platform.
    #[arrrg(optional, "Access token (default: $CITECHAT_ACCESS_TOKEN)", "TOKEN")]
    pub token: Option<String>,

    /// Session cache file for signed-in accounts.
    #[arrrg(optional, "File that remembers the signed-in account", "FILE")]
    pub session_cache: Option<String>,

    /// Sampling temperature for answers.
    #[arrrg(optional, "Answer temperature between 0 and 1", "TEMP")]
    pub temperature: Option<String>,

    /// Number of search results to retrieve.
    #[arrrg(optional, "Number of search results to retrieve", "N")]
    pub top: Option<u32>,

    /// Talk to the backend without signing in.
    #[arrrg(flag, "Do not require a signed-in account")]
    pub no_auth: bool,

    /// Hide suggested follow-up questions.
    #[arrrg(flag, "Hide follow-up questions")]
    pub no_followups: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// Log every backend call to stderr.
    #[arrrg(flag, "Log backend calls to stderr")]
    pub verbose: bool,
}

/// The YAML configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Backend base URL.
    pub base_url: Option<String>,
    /// User id sent with every dialog turn.
    pub user_id: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Overrides applied to every dialog turn.
    pub overrides: Option<ChatRequestOverrides>,
    /// Identity client configuration.
    pub auth: Option<AuthConfig>,
    /// Whether a signed-in account is required.
    pub require_auth: Option<bool>,
    /// Whether to show follow-up questions.
    pub show_followups: Option<bool>,
}

impl FileConfig {
    /// Parse a YAML configuration document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read and parse a YAML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let yaml = fs::read_to_string(path.as_ref())
            .map_err(|err| Error::io("failed to read configuration file", err))?;
        Self::from_yaml(&yaml)
    }
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Backend base URL; `None` defers to the client's default.
    pub base_url: Option<String>,

    /// User id; `None` uses the signed-in account's username.
    pub user_id: Option<String>,

    /// Request timeout; `None` uses the client's default.
    pub timeout: Option<Duration>,

    /// Overrides applied to every dialog turn.
    pub overrides: ChatRequestOverrides,

    /// Identity client configuration.
    pub auth: AuthConfig,

    /// Access token to sign in with at startup.
    pub access_token: Option<String>,

    /// Whether a signed-in account is required before chatting.
    pub require_auth: bool,

    /// Whether to show follow-up questions.
    pub show_followups: bool,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Whether to log backend calls.
    pub verbose: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Sign-in: required
    /// - Follow-up questions: shown
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            base_url: None,
            user_id: None,
            timeout: None,
            overrides: ChatRequestOverrides::default(),
            auth: AuthConfig::default(),
            access_token: None,
            require_auth: true,
            show_followups: true,
            use_color: true,
            verbose: false,
        }
    }

    /// Resolve command-line arguments, the configuration file they name, and the
    /// environment.
    pub fn from_args(args: ChatArgs) -> Result<Self> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        let env_token = env::var(ACCESS_TOKEN_ENV).ok().filter(|t| !t.is_empty());
        Self::resolve(args, file, env_token)
    }

    fn resolve(args: ChatArgs, file: FileConfig, env_token: Option<String>) -> Result<Self> {
        let mut config = Self::new().with_file(file);
        if args.base_url.is_some() {
            config.base_url = args.base_url;
        }
        if args.user_id.is_some() {
            config.user_id = args.user_id;
        }
        if let Some(temperature) = &args.temperature {
            config.overrides.temperature = Some(parse_temperature(temperature)?);
        }
        if args.top.is_some() {
            config.overrides.top = args.top;
        }
        if let Some(path) = args.session_cache {
            config.auth.cache_path = Some(PathBuf::from(path));
        }
        config.access_token = args.token.or(env_token);
        if args.no_auth {
            config.require_auth = false;
        }
        if args.no_followups {
            config.show_followups = false;
        }
        config.use_color = !args.no_color;
        config.verbose = args.verbose;
        Ok(config)
    }

    /// Applies the values present in a configuration file.
    pub fn with_file(mut self, file: FileConfig) -> Self {
        if file.base_url.is_some() {
            self.base_url = file.base_url;
        }
        if file.user_id.is_some() {
            self.user_id = file.user_id;
        }
        if let Some(secs) = file.timeout_secs {
            self.timeout = Some(Duration::from_secs(secs));
        }
        if let Some(overrides) = file.overrides {
            self.overrides = overrides;
        }
        if let Some(auth) = file.auth {
            self.auth = auth;
        }
        if let Some(require_auth) = file.require_auth {
            self.require_auth = require_auth;
        }
        if let Some(show_followups) = file.show_followups {
            self.show_followups = show_followups;
        }
        self
    }

    /// Sets the backend base URL.
    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }

    /// Sets the user id.
    pub fn with_user_id(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }

    /// Sets the overrides applied to every turn.
    pub fn with_overrides(mut self, overrides: ChatRequestOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// The user id to send, given the signed-in account's username if any.
    pub fn effective_user_id(&self, signed_in: Option<&str>) -> String {
        self.user_id
            .clone()
            .or_else(|| signed_in.map(str::to_string))
            .unwrap_or_else(|| DEFAULT_USER_ID.to_string())
    }
}

/// Parse a sampling temperature, which must lie in `0.0..=1.0`.
pub fn parse_temperature(value: &str) -> Result<f32> {
    match value.trim().parse::<f32>() {
        Ok(t) if t.is_finite() && (0.0..=1.0).contains(&t) => Ok(t),
        _ => Err(Error::validation(
            format!("temperature must be between 0 and 1, got {value:?}"),
            Some("temperature".to_string()),
        )),
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}
