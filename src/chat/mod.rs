//! Chat application module for conversations with Dream AI.
//!
//! This module provides the chat session controller and the pieces the
//! `dreamchat` REPL is built from:
//!
//! - Streaming replies shown as they arrive
//! - One-shot image replies and a sticky background image
//! - Slash commands for session control
//!
//! # Architecture
//!
//! The module is organized into several components:
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: Session state and the exchange state machine
//! - [`commands`]: Slash command parsing and handling

mod commands;
mod config;
mod session;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, GREETING};
pub use session::{
    ChatSession, ERROR_REPLY, ExchangeOutcome, IMAGE_CAPTION, SessionState, SessionStats,
};
