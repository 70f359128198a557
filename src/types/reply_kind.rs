use serde::{Deserialize, Serialize};

/// The kind of reply the backend produced, carried in the wire `type` field.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyKind {
    /// A generated image.
    Image,

    /// An interpretation of a dream.
    Analysis,

    /// A short story based on the last dream.
    Story,

    /// A poem based on the last dream.
    Poem,

    /// Any kind this client does not know about.
    #[serde(other)]
    Other,
}
