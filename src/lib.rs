// Public modules
pub mod chat;
pub mod client;
pub mod decoder;
pub mod error;
pub mod render;
pub mod sse;
pub mod types;

mod observability;

// Re-exports
pub use client::{Backend, DreamClient, EventStream, Reply};
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use render::{PlainTextRenderer, Renderer};
pub use types::*;
