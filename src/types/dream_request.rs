use serde::{Deserialize, Serialize};

/// The body of a submission to the dream endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DreamRequest {
    /// The text exactly as the person typed it.
    pub dream_input: String,
}

impl DreamRequest {
    /// Create a new `DreamRequest` for the given input.
    pub fn new(dream_input: impl Into<String>) -> Self {
        Self {
            dream_input: dream_input.into(),
        }
    }
}
