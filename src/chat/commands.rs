//! Slash command parsing for the chat application.
//!
//! Input that starts with `/` controls the session locally and is never sent
//! to the dream service.

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Start over with only the greeting, as a fresh session would.
    Reset,

    /// Print every message in the log.
    History,

    /// Show the current background image.
    Background,

    /// Display session statistics.
    Stats,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command,
/// or `None` if it should be sent as a regular message.
///
/// # Examples
///
/// ```
/// # use dreamchat::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("I dreamt of flying").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "reset" | "clear" => ChatCommand::Reset,
        "history" => ChatCommand::History,
        "background" | "bg" => ChatCommand::Background,
        "stats" | "status" => ChatCommand::Stats,
        "" => ChatCommand::Invalid("empty command; try /help".to_string()),
        other => ChatCommand::Invalid(format!("unknown command /{other}; try /help")),
    };

    match (&result, argument) {
        (ChatCommand::Invalid(_), _) | (_, None) => Some(result),
        (_, Some(arg)) => Some(ChatCommand::Invalid(format!(
            "/{command} takes no arguments (got '{arg}')"
        ))),
    }
}

/// Returns the help text listing every command.
pub fn help_text() -> &'static str {
    "Commands:
  /help, /?              Show this help
  /quit, /exit, /q       Exit
  /reset, /clear         Start a fresh conversation
  /history               Print the conversation so far
  /background, /bg       Show the current background image
  /stats, /status        Show session statistics

Anything else is sent to Dream AI.  Share a dream first, then ask for a
story, a poem, or an image."
}
