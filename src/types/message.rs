use serde::{Deserialize, Serialize};

/// Who wrote a message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The person chatting.
    User,

    /// Dream AI.
    Bot,
}

/// One entry in the message log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The message text.  For a streaming bot message this is the latest
    /// cumulative text.
    pub text: String,

    /// Who wrote the message.
    pub sender: Sender,

    /// An image attached to the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// True while the message is still receiving stream events.
    #[serde(default)]
    pub is_streaming: bool,
}

impl Message {
    /// Create a new `Message` with the given text and sender.
    pub fn new(text: impl Into<String>, sender: Sender) -> Self {
        Self {
            text: text.into(),
            sender,
            image_url: None,
            is_streaming: false,
        }
    }

    /// Create a new user `Message`.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(text, Sender::User)
    }

    /// Create a new bot `Message`.
    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(text, Sender::Bot)
    }

    /// Create an empty bot `Message` that is about to receive stream events.
    pub fn streaming() -> Self {
        Self {
            is_streaming: true,
            ..Self::bot("")
        }
    }

    /// Attach an image to the message.
    pub fn with_image_url(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url;
        self
    }

    /// Returns true if the person chatting wrote this message.
    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }
}
