use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error body the users API may attach to a non-2xx response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("Username and Phone are required.")]
    MissingRequiredFields,
}
