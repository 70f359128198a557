use serde::{Deserialize, Serialize};

use crate::types::ReplyKind;

/// One `data:` event from a streamed reply.
///
/// `text` is cumulative: each event carries the whole reply so far, not a delta.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    /// The reply text so far.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// An image generated alongside the reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// What the backend was asked to produce.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ReplyKind>,
}

impl StreamEvent {
    /// Create a new `StreamEvent` carrying the given cumulative text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Attach an image URL to the event.
    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    /// The text to show, if the event carries any.
    ///
    /// An empty string carries nothing; the last message keeps its text.
    pub fn display_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|text| !text.is_empty())
    }
}
