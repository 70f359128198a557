//! Output rendering for the chat session.
//!
//! The session reports every change to its message log through the
//! [`Renderer`] trait, so a view can redraw as soon as state changes.
//! [`PlainTextRenderer`] is the terminal view used by the `dreamchat` binary.

use std::io::{self, Stdout, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::Message;

/// ANSI escape code for bold text (used for the bot label).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code for dim text (used for info lines).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for image links).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for magenta text (used for the bot label).
const ANSI_MAGENTA: &str = "\x1b[35m";

/// Label printed before bot messages.
const BOT_LABEL: &str = "Dream AI:";

/// Trait for rendering session updates.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
/// - Recording updates in tests
pub trait Renderer: Send {
    /// Called after a message is appended to the log.
    fn message_appended(&mut self, message: &Message);

    /// Called after the last message in the log changed in place.
    fn message_updated(&mut self, message: &Message);

    /// Called when the background image changes.
    fn background_changed(&mut self, image_url: &str);

    /// Called when a request starts or settles.
    fn loading_changed(&mut self, _is_loading: bool) {}

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Called when the stream is interrupted by the user.
    fn print_interrupted(&mut self) {}

    /// Returns true if streaming should be interrupted.
    fn should_interrupt(&self) -> bool {
        false
    }
}

/// Plain text renderer with optional ANSI styling.
///
/// Streamed text is cumulative, so the renderer remembers what it already
/// printed for the live message and prints only the new suffix.  If an update
/// does not extend what was printed, the message is printed again in full.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    echo_user: bool,
    shown_text: String,
    shown_image: Option<String>,
    interrupted: Option<Arc<AtomicBool>>,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            echo_user: false,
            shown_text: String::new(),
            shown_image: None,
            interrupted: None,
        }
    }

    /// Attaches an interrupt flag to the renderer.
    pub fn with_interrupt(mut self, interrupted: Arc<AtomicBool>) -> Self {
        self.interrupted = Some(interrupted);
        self
    }

    /// Also print user messages.  The REPL leaves this off because the
    /// line editor already shows what was typed.
    pub fn with_user_echo(mut self, echo_user: bool) -> Self {
        self.echo_user = echo_user;
        self
    }

    /// Prints an entire message, e.g. when replaying history.
    pub fn print_message(&mut self, message: &Message) {
        if message.is_user() {
            print!("You: {}", message.text);
        } else {
            self.print_label();
            print!("{}", message.text);
        }
        if let Some(image_url) = &message.image_url {
            self.print_image(image_url);
        }
        println!();
        self.flush();
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn print_label(&mut self) {
        if self.use_color {
            print!("{ANSI_BOLD}{ANSI_MAGENTA}{BOT_LABEL}{ANSI_RESET} ");
        } else {
            print!("{BOT_LABEL} ");
        }
    }

    fn print_image(&mut self, image_url: &str) {
        if self.use_color {
            print!("\n{ANSI_CYAN}[image: {image_url}]{ANSI_RESET}");
        } else {
            print!("\n[image: {image_url}]");
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn message_appended(&mut self, message: &Message) {
        self.shown_text.clear();
        self.shown_image = None;
        if message.is_user() && !self.echo_user {
            return;
        }
        if message.is_streaming {
            self.print_label();
            print!("{}", message.text);
            self.shown_text.clone_from(&message.text);
            self.flush();
        } else {
            self.print_message(message);
        }
    }

    fn message_updated(&mut self, message: &Message) {
        if message.is_user() {
            return;
        }
        if let Some(suffix) = message.text.strip_prefix(self.shown_text.as_str()) {
            print!("{suffix}");
        } else {
            println!();
            self.print_label();
            print!("{}", message.text);
        }
        self.shown_text.clone_from(&message.text);

        if message.image_url != self.shown_image {
            if let Some(image_url) = &message.image_url {
                self.print_image(image_url);
                println!();
            }
            self.shown_image.clone_from(&message.image_url);
        }

        if !message.is_streaming {
            println!();
            self.shown_text.clear();
            self.shown_image = None;
        }
        self.flush();
    }

    fn background_changed(&mut self, image_url: &str) {
        if self.use_color {
            println!("{ANSI_DIM}[background: {image_url}]{ANSI_RESET}");
        } else {
            println!("[background: {image_url}]");
        }
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        eprintln!("\nError: {error}");
    }

    fn print_info(&mut self, info: &str) {
        if self.use_color {
            println!("{ANSI_DIM}{info}{ANSI_RESET}");
        } else {
            println!("{info}");
        }
        self.flush();
    }

    fn print_interrupted(&mut self) {
        print!("\n[interrupted]");
        self.flush();
    }

    fn should_interrupt(&self) -> bool {
        self.interrupted
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}
