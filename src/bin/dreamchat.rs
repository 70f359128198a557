//! Interactive chat application for talking to Dream AI.
//!
//! This binary provides a streaming REPL interface to the Dream AI service:
//! share a dream to get an interpretation, then ask for a story, a poem, or an
//! image.
//!
//! # Usage
//!
//! ```bash
//! # Talk to the service named by $DREAM_API_URL (or http://localhost:5000)
//! dreamchat
//!
//! # Specify the service explicitly
//! dreamchat --endpoint https://dreams.example.com
//!
//! # Disable colors (useful for piping output)
//! dreamchat --no-color
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/reset` - Start a fresh conversation
//! - `/history` - Print the conversation so far
//! - `/background` - Show the current background image
//! - `/stats` - Show session statistics
//! - `/quit` - Exit the application

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use dreamchat::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, help_text,
    parse_command,
};
use dreamchat::Backend;

/// Main entry point for the dreamchat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("dreamchat [OPTIONS]");
    let config = ChatConfig::from(args);
    init_tracing(config.verbose);
    let use_color = config.use_color;

    let mut session = ChatSession::new(config)?;
    let mut rl = DefaultEditor::new()?;

    // Flag for interrupt handling during streaming
    let interrupted = Arc::new(AtomicBool::new(false));
    let mut renderer = PlainTextRenderer::with_color(use_color).with_interrupt(interrupted.clone());

    // Set up Ctrl+C handler
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::Relaxed);
    })?;

    println!("Dream AI ({})", session.backend().endpoint());
    println!("Type /help for commands, /quit to exit\n");
    for message in session.messages() {
        renderer.print_message(message);
    }

    loop {
        // Reset interrupt flag before each input
        interrupted.store(false, Ordering::Relaxed);

        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line.as_str());

                if let Some(cmd) = parse_command(&line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Reset => {
                            session.reset();
                            renderer.print_info("Conversation reset.");
                            for message in session.messages() {
                                renderer.print_message(message);
                            }
                        }
                        ChatCommand::History => {
                            for message in session.messages() {
                                renderer.print_message(message);
                            }
                        }
                        ChatCommand::Background => match session.background_image_url() {
                            Some(url) => renderer.print_info(&format!("Background: {url}")),
                            None => renderer.print_info("Background: (default)"),
                        },
                        ChatCommand::Stats => {
                            print_stats(&session);
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                // Regular message - send to the service
                let outcome = session.send(&line, &mut renderer).await;
                if let Some(err) = outcome.error() {
                    tracing::debug!(error = %err, "exchange failed");
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
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "dreamchat=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_stats<B: Backend>(session: &ChatSession<B>) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Messages: {}", stats.message_count);
    println!(
        "      Exchanges: {} ({} failed)",
        stats.exchanges, stats.failed_exchanges
    );
    println!(
        "      Stream events: {} applied, {} malformed",
        stats.stream_events, stats.malformed_events
    );
    match stats.background_image_url {
        Some(ref url) => println!("      Background: {url}"),
        None => println!("      Background: (default)"),
    }
}
