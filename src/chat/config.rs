//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior.

use std::time::Duration;

use arrrg_derive::CommandLine;

/// Greeting seeded into every new session.
pub const GREETING: &str = "Hi! I'm Dream AI. I can help you analyze your dreams, create stories, write poetry, or generate dream-inspired images. Just tell me what you'd like to do!";

/// Command-line arguments for the dreamchat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Base URL of the dream service.
    #[arrrg(
        optional,
        "Dream service URL (default: $DREAM_API_URL or http://localhost:5000)",
        "URL"
    )]
    pub endpoint: Option<String>,

    /// Whole-request timeout in seconds.
    #[arrrg(optional, "Request timeout in seconds (default: none)", "SECONDS")]
    pub timeout_secs: Option<u64>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// Log debug diagnostics to stderr.
    #[arrrg(flag, "Log debug diagnostics to stderr")]
    pub verbose: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Base URL of the dream service; `None` defers to the environment.
    pub endpoint: Option<String>,

    /// Whole-request timeout; `None` leaves streams unbounded.
    pub timeout: Option<Duration>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Whether to log debug diagnostics.
    pub verbose: bool,

    /// The bot message every session starts with.
    pub greeting: String,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Endpoint: from the environment
    /// - Timeout: none
    /// - Color: enabled
    /// - Greeting: the Dream AI introduction
    pub fn new() -> Self {
        Self {
            endpoint: None,
            timeout: None,
            use_color: true,
            verbose: false,
            greeting: GREETING.to_string(),
        }
    }

    /// Sets the service endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Sets the greeting seeded into new sessions.
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        ChatConfig {
            endpoint: args.endpoint,
            timeout: args.timeout_secs.map(Duration::from_secs),
            use_color: !args.no_color,
            verbose: args.verbose,
            ..ChatConfig::new()
        }
    }
}
