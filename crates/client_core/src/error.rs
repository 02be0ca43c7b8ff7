use shared::error::DraftError;
use thiserror::Error;

/// Every way a users API attempt can fail, normalized into one channel.
///
/// The `Display` text is exactly what the view state shows in its error
/// banner.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiFailure {
    #[error("{0}")]
    Validation(#[from] DraftError),
    #[error(
        "Server returned non-JSON content (status {status}): {detail}. Check if the API route is correct or if the server is returning a 404/500 HTML page."
    )]
    NonJsonResponse { status: u16, detail: String },
    #[error("{message}")]
    Http { status: u16, message: String },
    #[error("Connection failed. Make sure the API server is running on {base_url}. Details: {detail}.")]
    Connection { base_url: String, detail: String },
    #[error("Unexpected response payload: {0}")]
    UnexpectedPayload(String),
}

impl ApiFailure {
    pub fn http_status(status: u16) -> Self {
        Self::Http {
            status,
            message: format!("HTTP error, status={status}"),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NonJsonResponse { status, .. } | Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_matches_form_hint() {
        let failure = ApiFailure::from(DraftError::MissingRequiredFields);
        assert!(failure.is_validation());
        assert_eq!(failure.to_string(), "Username and Phone are required.");
    }

    #[test]
    fn generic_http_message_names_status() {
        let failure = ApiFailure::http_status(503);
        assert_eq!(failure.to_string(), "HTTP error, status=503");
        assert_eq!(failure.status(), Some(503));
    }

    #[test]
    fn connection_message_includes_base_url_and_detail() {
        let failure = ApiFailure::Connection {
            base_url: "http://127.0.0.1:5000".into(),
            detail: "connection refused".into(),
        };
        let text = failure.to_string();
        assert!(text.contains("http://127.0.0.1:5000"), "{text}");
        assert!(text.contains("connection refused"), "{text}");
        assert_eq!(failure.status(), None);
    }
}
