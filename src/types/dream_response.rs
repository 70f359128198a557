use serde::{Deserialize, Serialize};

use crate::types::ReplyKind;

/// Whether the backend handled the request.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    /// The request was handled.
    Success,

    /// The request failed; `message` says why.
    Error,

    /// A status this client does not know about, or none at all.
    #[default]
    #[serde(other)]
    Unknown,
}

/// A one-shot JSON reply from the dream endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DreamResponse {
    /// Outcome reported by the backend.
    #[serde(default)]
    pub status: ResponseStatus,

    /// What was produced.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ReplyKind>,

    /// URL of the generated image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Explanation accompanying an error status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DreamResponse {
    /// Create a successful image reply.
    pub fn image(image_url: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Success,
            kind: Some(ReplyKind::Image),
            image_url: Some(image_url.into()),
            message: None,
        }
    }

    /// Create an error reply.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            kind: None,
            image_url: None,
            message: Some(message.into()),
        }
    }

    /// Returns true if this is a successful image reply.
    pub fn is_image(&self) -> bool {
        self.status == ResponseStatus::Success && self.kind == Some(ReplyKind::Image)
    }
}
