// Public modules
pub mod dream_request;
pub mod dream_response;
pub mod message;
pub mod reply_kind;
pub mod stream_event;

// Re-exports
pub use dream_request::DreamRequest;
pub use dream_response::{DreamResponse, ResponseStatus};
pub use message::{Message, Sender};
pub use reply_kind::ReplyKind;
pub use stream_event::StreamEvent;
